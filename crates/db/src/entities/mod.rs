//! `SeaORM` entity definitions.

pub mod prelude;

pub mod accounting_periods;
pub mod accounts;
pub mod cash_bank_transactions;
pub mod cash_banks;
pub mod journal_entries;
pub mod journal_lines;
pub mod payment_allocations;
pub mod payments;
pub mod purchases;
pub mod sales;
