//! Ledger-consistency engine for Neraca.
//!
//! This crate turns business events into balanced double-entry postings and
//! keeps every subsidiary ledger in agreement with the chart of accounts.
//! It has ZERO web or database dependencies; persistence goes through the
//! [`store`] seam.
//!
//! # Modules
//!
//! - `ledger` - Posting primitive, balance propagation, reversals
//! - `posting` - Event posters for sales, purchases, and payments
//! - `cashbank` - Cash/bank ⇄ COA synchronizer and drift detection
//! - `payment` - Payment allocation and cancellation
//! - `closing` - Period and fiscal-year closing
//! - `store` - Unit-of-work traits and the in-memory store

pub mod cashbank;
pub mod closing;
pub mod documents;
pub mod ledger;
pub mod observability;
pub mod payment;
pub mod posting;
pub mod store;

#[cfg(test)]
mod testing;
