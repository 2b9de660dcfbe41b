//! Double-entry bookkeeping logic.
//!
//! This module implements the posting primitive the rest of the engine is
//! built on:
//! - Domain types for accounts, entries, and lines
//! - Line validation
//! - Balance propagation through the account tree
//! - Reversing entries
//! - The duplicate-posting guard

pub mod balance;
pub mod error;
pub mod reversal;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod reversal_props;
#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use error::{LedgerError, LedgerResult};
pub use reversal::ReversalService;
pub use service::{Ledger, PostingService};
pub use types::{
    Account, AccountType, EntryStatus, JournalEntry, JournalLine, LineInput, PostingRequest,
    ReversalRequest, SourceRef, SourceType,
};
pub use validation::{LineTotals, validate_lines};
