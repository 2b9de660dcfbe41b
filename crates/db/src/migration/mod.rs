//! Ledger schema migrations.
//!
//! Run through `bins/migrator` or `Migrator::up` in integration tests.

pub use sea_orm_migration::prelude::*;

mod m20260108_000001_initial;

/// Applies the ledger schema in order.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260108_000001_initial::Migration)]
    }
}
