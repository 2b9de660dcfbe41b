//! Schema migration runner for the Neraca ledger tables.
//!
//! Usage:
//!   migrator up      - Apply pending migrations
//!   migrator down    - Roll back the last migration
//!   migrator status  - List applied and pending migrations
//!   migrator fresh   - Drop the ledger tables and migrate from scratch
//!
//! Reads `DATABASE_URL` from the environment or a `.env` file.

use neraca_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // sea-orm-migration installs its own subscriber
    cli::run_cli(Migrator).await;
}
