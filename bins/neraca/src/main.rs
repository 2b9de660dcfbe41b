//! neraca - ledger maintenance CLI
//!
//! Runs the engine's maintenance operations against the configured database:
//! cash/bank synchronization, event posting, payment cancellation, and
//! period closing. Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use neraca_shared::AppConfig;
use neraca_shared::types::{CashBankId, PaymentId, PurchaseId, SaleId, UserId};

mod commands;

/// neraca - ledger maintenance CLI
#[derive(Parser, Debug)]
#[command(name = "neraca")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "neraca=debug")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // === Cash/bank synchronization ===
    /// Recompute one register from its transactions and push it to its account
    Sync {
        /// Register ID
        cash_bank: CashBankId,
    },

    /// Sync every active linked register
    SyncAll,

    /// Report registers whose balances disagree
    Discrepancies {
        /// Include registers that are in sync
        #[arg(long)]
        all: bool,
    },

    /// Sync every register that has a discrepancy
    AutoFix,

    // === Event posting ===
    /// Post the journal for a sales invoice
    PostSale {
        /// Sale ID
        sale: SaleId,
    },

    /// Post the journal for a purchase bill
    PostPurchase {
        /// Purchase ID
        purchase: PurchaseId,
    },

    /// Cancel a payment and undo its allocations
    CancelPayment {
        /// Payment ID
        payment: PaymentId,

        /// Cancellation reason
        #[arg(long)]
        reason: String,

        /// Acting user
        #[arg(long)]
        user: Option<UserId>,
    },

    // === Period closing ===
    /// Show what closing a period would post
    PreviewClose {
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
    },

    /// Close a period into retained earnings
    Close {
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Closing notes
        #[arg(long, default_value = "")]
        notes: String,

        /// Acting user
        #[arg(long)]
        user: Option<UserId>,
    },

    /// Show what closing the fiscal year ending on END would post
    PreviewYear {
        /// Fiscal year end (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
    },

    /// Close the fiscal year ending on END
    CloseYear {
        /// Fiscal year end (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Closing notes
        #[arg(long, default_value = "")]
        notes: String,

        /// Acting user
        #[arg(long)]
        user: Option<UserId>,
    },

    /// Reverse a closing and mark the period open
    Reopen {
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Why the period is reopened
        #[arg(long)]
        reason: String,

        /// Acting user
        #[arg(long)]
        user: Option<UserId>,
    },

    /// Permanently lock a closed period
    Lock {
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
    },

    /// List closed and reopened periods, newest first
    History {
        /// Maximum number of periods
        #[arg(long, default_value_t = 12)]
        limit: usize,
    },

    /// Show the last closing date and the next period start
    LastClosing,

    /// Check whether a date falls inside a closed period
    IsClosed {
        /// Date to check (YYYY-MM-DD)
        date: NaiveDate,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let json = config.logging.json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let db = neraca_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    let engine = commands::Engine::new(db, &config);

    commands::run(&engine, cli.command).await
}
