//! Command dispatch onto the ledger engine.

use std::sync::Arc;

use anyhow::Result;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::info;

use neraca_core::cashbank::{CashBankSynchronizer, DiscrepancyKind};
use neraca_core::closing::PeriodCloser;
use neraca_core::ledger::PostingService;
use neraca_core::observability::{LedgerMetrics, TracingMetrics};
use neraca_core::payment::PaymentAllocator;
use neraca_core::posting::EventPoster;
use neraca_db::LedgerRepository;
use neraca_shared::AppConfig;

use crate::Commands;

/// Engine services sharing one repository.
pub struct Engine {
    sync: CashBankSynchronizer<LedgerRepository>,
    poster: EventPoster<LedgerRepository>,
    payments: PaymentAllocator<LedgerRepository>,
    closer: PeriodCloser<LedgerRepository>,
}

impl Engine {
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        let store = Arc::new(LedgerRepository::new(db));
        let metrics: Arc<dyn LedgerMetrics> = Arc::new(TracingMetrics);
        let epsilon = config.ledger.balance_epsilon;
        let posting = PostingService::new(epsilon, Arc::clone(&metrics));
        let poster = EventPoster::new(
            Arc::clone(&store),
            posting.clone(),
            Arc::new(config.accounts.clone()),
        );

        Self {
            sync: CashBankSynchronizer::new(Arc::clone(&store), epsilon, metrics),
            payments: PaymentAllocator::new(Arc::clone(&store), poster.clone()),
            closer: PeriodCloser::new(store, posting, &config.ledger),
            poster,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(engine: &Engine, command: Commands) -> Result<()> {
    match command {
        Commands::Sync { cash_bank } => {
            let balance = engine.sync.sync(cash_bank).await?;
            if balance.is_none() {
                info!(%cash_bank, "register is not linked, nothing synced");
            }
            print_json(&balance)
        }
        Commands::SyncAll => {
            let synced = engine.sync.sync_all().await?;
            print_json(&serde_json::json!({ "synced": synced }))
        }
        Commands::Discrepancies { all } => {
            let mut rows = engine.sync.find_discrepancies().await?;
            if !all {
                rows.retain(|row| row.kind != DiscrepancyKind::SyncOk);
            }
            print_json(&rows)
        }
        Commands::AutoFix => {
            let fixed = engine.sync.auto_fix().await?;
            print_json(&serde_json::json!({ "fixed": fixed }))
        }
        Commands::PostSale { sale } => print_json(&engine.poster.post_sale(sale).await?),
        Commands::PostPurchase { purchase } => {
            print_json(&engine.poster.post_purchase(purchase).await?)
        }
        Commands::CancelPayment {
            payment,
            reason,
            user,
        } => print_json(&engine.payments.cancel_payment(payment, &reason, user).await?),
        Commands::PreviewClose { start, end } => {
            print_json(&engine.closer.preview_close_period(start, end).await?)
        }
        Commands::Close {
            start,
            end,
            notes,
            user,
        } => print_json(&engine.closer.close_period(start, end, &notes, user).await?),
        Commands::PreviewYear { end } => {
            print_json(&engine.closer.preview_fiscal_year_closing(end).await?)
        }
        Commands::CloseYear { end, notes, user } => {
            print_json(&engine.closer.close_fiscal_year(end, &notes, user).await?)
        }
        Commands::Reopen {
            start,
            end,
            reason,
            user,
        } => print_json(&engine.closer.reopen_period(start, end, &reason, user).await?),
        Commands::Lock { start, end } => {
            print_json(&engine.closer.lock_period(start, end).await?)
        }
        Commands::History { limit } => print_json(&engine.closer.closing_history(limit).await?),
        Commands::LastClosing => print_json(&engine.closer.last_closing_info().await?),
        Commands::IsClosed { date } => {
            print_json(&engine.closer.is_date_in_closed_period(date).await?)
        }
    }
}
