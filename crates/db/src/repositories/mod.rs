//! Repository abstractions for data access.
//!
//! Repositories implement the engine's storage seam on top of `SeaORM`,
//! hiding the implementation details from the rest of the application.

pub mod convert;
pub mod ledger;

pub use ledger::{LedgerRepository, PgUnitOfWork};
