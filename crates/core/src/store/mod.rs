//! Storage seam for the ledger engine.
//!
//! The engine never talks to a database directly. Every mutating operation
//! opens one [`UnitOfWork`] through [`LedgerStore::begin`], performs its reads
//! and writes through it, and calls [`UnitOfWork::commit`]. Dropping a unit of
//! work without committing discards everything written through it.
//!
//! These traits are implemented by the db crate (Postgres via SeaORM) and by
//! [`memory::MemoryStore`].

pub mod memory;

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use neraca_shared::types::{
    AccountId, CashBankId, CashBankTransactionId, JournalEntryId, PaymentId, PurchaseId, SaleId,
};

use crate::cashbank::{CashBank, CashBankTransaction};
use crate::closing::AccountingPeriod;
use crate::documents::{Purchase, Sale};
use crate::ledger::types::{Account, AccountType, JournalEntry, JournalLine, SourceRef};
use crate::payment::{Payment, PaymentAllocation};

pub use memory::MemoryStore;

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure (connection, commit, query).
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Lock timeout or serialization failure.
    #[error("Concurrent modification detected, please retry: {0}")]
    Conflict(String),

    /// An update targeted a row that does not exist.
    #[error("Row not found: {0}")]
    Missing(String),
}

impl StoreError {
    /// Returns true if the caller may retry the whole operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Entry point to transactional storage.
pub trait LedgerStore: Send + Sync {
    /// Unit-of-work type produced by this store.
    type Unit: UnitOfWork;

    /// Opens a new atomic unit of work.
    fn begin(&self) -> impl Future<Output = StoreResult<Self::Unit>> + Send;
}

/// One atomic transaction boundary.
///
/// Reads of rows that will be mutated take a row lock in implementations
/// that support it, so check-then-act sequences stay race free.
pub trait UnitOfWork: Send {
    // ========== Accounts ==========

    /// Finds an account by ID.
    fn account(&mut self, id: AccountId) -> impl Future<Output = StoreResult<Option<Account>>> + Send;

    /// Finds an account by its code.
    fn account_by_code(
        &mut self,
        code: &str,
    ) -> impl Future<Output = StoreResult<Option<Account>>> + Send;

    /// Lists all accounts of the given type, locked for the rest of the unit
    /// of work so closing posts against the balances it previewed.
    fn accounts_of_type(
        &mut self,
        account_type: AccountType,
    ) -> impl Future<Output = StoreResult<Vec<Account>>> + Send;

    /// Sums the balances of the direct children of `parent_id`.
    fn child_balance_sum(
        &mut self,
        parent_id: AccountId,
    ) -> impl Future<Output = StoreResult<Decimal>> + Send;

    /// Overwrites an account's balance.
    fn set_account_balance(
        &mut self,
        id: AccountId,
        balance: Decimal,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    // ========== Journal ==========

    /// Inserts an entry together with its lines.
    fn insert_entry(
        &mut self,
        entry: JournalEntry,
        lines: Vec<JournalLine>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Finds an entry by ID.
    fn entry(
        &mut self,
        id: JournalEntryId,
    ) -> impl Future<Output = StoreResult<Option<JournalEntry>>> + Send;

    /// Lists an entry's lines ordered by line number.
    fn entry_lines(
        &mut self,
        id: JournalEntryId,
    ) -> impl Future<Output = StoreResult<Vec<JournalLine>>> + Send;

    /// Finds the POSTED entry for a source, if any.
    fn find_posted_entry(
        &mut self,
        source: SourceRef,
    ) -> impl Future<Output = StoreResult<Option<JournalEntry>>> + Send;

    /// Returns true if an entry already uses `code`.
    fn entry_code_exists(&mut self, code: &str) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Marks `original` REVERSED and links it with `reversal` in both directions.
    fn link_reversal(
        &mut self,
        original: JournalEntryId,
        reversal: JournalEntryId,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Lists entries dated within `[start, end]` in any status.
    fn entries_between(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = StoreResult<Vec<JournalEntry>>> + Send;

    // ========== Cash & Bank ==========

    /// Finds a cash/bank register by ID.
    fn cash_bank(
        &mut self,
        id: CashBankId,
    ) -> impl Future<Output = StoreResult<Option<CashBank>>> + Send;

    /// Lists all active cash/bank registers.
    fn active_cash_banks(&mut self) -> impl Future<Output = StoreResult<Vec<CashBank>>> + Send;

    /// Persists a register's balance and account link.
    fn update_cash_bank(
        &mut self,
        cash_bank: &CashBank,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Sums the amounts of non-deleted subsidiary transactions.
    fn cash_bank_transaction_sum(
        &mut self,
        id: CashBankId,
    ) -> impl Future<Output = StoreResult<Decimal>> + Send;

    /// Appends a subsidiary transaction.
    fn insert_cash_bank_transaction(
        &mut self,
        transaction: &CashBankTransaction,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Finds a subsidiary transaction by ID.
    fn cash_bank_transaction(
        &mut self,
        id: CashBankTransactionId,
    ) -> impl Future<Output = StoreResult<Option<CashBankTransaction>>> + Send;

    /// Marks a subsidiary transaction deleted.
    fn soft_delete_cash_bank_transaction(
        &mut self,
        id: CashBankTransactionId,
        deleted_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    // ========== Sales & Purchases ==========

    /// Finds a sale by ID.
    fn sale(&mut self, id: SaleId) -> impl Future<Output = StoreResult<Option<Sale>>> + Send;

    /// Persists a sale's paid/outstanding amounts and statuses.
    fn update_sale_settlement(&mut self, sale: &Sale)
    -> impl Future<Output = StoreResult<()>> + Send;

    /// Finds a purchase by ID.
    fn purchase(
        &mut self,
        id: PurchaseId,
    ) -> impl Future<Output = StoreResult<Option<Purchase>>> + Send;

    /// Persists a purchase's paid/outstanding amounts and statuses.
    fn update_purchase_settlement(
        &mut self,
        purchase: &Purchase,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    // ========== Payments ==========

    /// Inserts a payment.
    fn insert_payment(&mut self, payment: &Payment) -> impl Future<Output = StoreResult<()>> + Send;

    /// Finds a payment by ID.
    fn payment(&mut self, id: PaymentId)
    -> impl Future<Output = StoreResult<Option<Payment>>> + Send;

    /// Persists a payment's status, journal link, and notes.
    fn update_payment(&mut self, payment: &Payment) -> impl Future<Output = StoreResult<()>> + Send;

    /// Inserts a payment allocation.
    fn insert_allocation(
        &mut self,
        allocation: &PaymentAllocation,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Lists the allocations of a payment.
    fn allocations_for_payment(
        &mut self,
        id: PaymentId,
    ) -> impl Future<Output = StoreResult<Vec<PaymentAllocation>>> + Send;

    // ========== Accounting periods ==========

    /// Lists all accounting periods.
    fn accounting_periods(
        &mut self,
    ) -> impl Future<Output = StoreResult<Vec<AccountingPeriod>>> + Send;

    /// Inserts an accounting period.
    fn insert_period(
        &mut self,
        period: &AccountingPeriod,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Persists an accounting period.
    fn update_period(
        &mut self,
        period: &AccountingPeriod,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    // ========== Boundary ==========

    /// Commits every write made through this unit of work.
    fn commit(self) -> impl Future<Output = StoreResult<()>> + Send;
}
