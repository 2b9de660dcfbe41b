//! Cash/bank subsidiary ledger and its synchronization with the chart of
//! accounts.

pub mod error;
pub mod service;
pub mod types;

pub use error::{CashBankError, CashBankResult};
pub use service::{CashBankSynchronizer, append_transaction_in, sync_in};
pub use types::{
    CashBank, CashBankReference, CashBankTransaction, Discrepancy, DiscrepancyKind,
    NewCashBankTransaction,
};
