//! Postgres implementation of the engine's storage seam.
//!
//! Each [`PgUnitOfWork`] wraps one database transaction. Reads of rows the
//! engine may go on to mutate are taken `FOR UPDATE`, so the duplicate guard,
//! balance read-modify-write, and allocation checks cannot race a concurrent
//! unit of work. The partial unique index on posted sources backs the guard.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::debug;

use neraca_core::cashbank::{CashBank, CashBankTransaction};
use neraca_core::closing::AccountingPeriod;
use neraca_core::documents::{Purchase, Sale};
use neraca_core::ledger::{Account, AccountType, EntryStatus, JournalEntry, JournalLine, SourceRef};
use neraca_core::payment::{Payment, PaymentAllocation};
use neraca_core::store::{LedgerStore, StoreError, StoreResult, UnitOfWork};
use neraca_shared::types::{
    AccountId, CashBankId, CashBankTransactionId, JournalEntryId, PaymentId, PurchaseId, SaleId,
};

use super::convert::{
    allocation_active, cash_bank_transaction_active, db_err, entry_active, line_active,
    payment_active, period_active,
};
use crate::entities::{
    accounting_periods, accounts, cash_bank_transactions, cash_banks, journal_entries,
    journal_lines, payment_allocations, payments, purchases, sales,
};

/// Ledger store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl LedgerStore for LedgerRepository {
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> StoreResult<PgUnitOfWork> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(PgUnitOfWork { txn })
    }
}

/// One Postgres transaction. Dropping it without [`UnitOfWork::commit`]
/// rolls back.
pub struct PgUnitOfWork {
    txn: DatabaseTransaction,
}

impl std::fmt::Debug for PgUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUnitOfWork").finish_non_exhaustive()
    }
}

fn ensure_updated(rows: u64, what: &str, id: impl std::fmt::Display) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::Missing(format!("{what} {id}")))
    } else {
        Ok(())
    }
}

impl UnitOfWork for PgUnitOfWork {
    // ========== Accounts ==========

    async fn account(&mut self, id: AccountId) -> StoreResult<Option<Account>> {
        accounts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(Account::try_from)
            .transpose()
    }

    async fn account_by_code(&mut self, code: &str) -> StoreResult<Option<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::Code.eq(code))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(Account::try_from)
            .transpose()
    }

    async fn accounts_of_type(&mut self, account_type: AccountType) -> StoreResult<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::AccountType.eq(account_type.as_str()))
            .order_by_asc(accounts::Column::Code)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn child_balance_sum(&mut self, parent_id: AccountId) -> StoreResult<Decimal> {
        let total: Option<Option<Decimal>> = accounts::Entity::find()
            .select_only()
            .column_as(accounts::Column::Balance.sum(), "total")
            .filter(accounts::Column::ParentId.eq(parent_id.into_inner()))
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(total.flatten().unwrap_or_default())
    }

    async fn set_account_balance(&mut self, id: AccountId, balance: Decimal) -> StoreResult<()> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(balance))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "account", id)
    }

    // ========== Journal ==========

    async fn insert_entry(&mut self, entry: JournalEntry, lines: Vec<JournalLine>) -> StoreResult<()> {
        entry_active(&entry)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        if !lines.is_empty() {
            journal_lines::Entity::insert_many(lines.iter().map(line_active))
                .exec(&self.txn)
                .await
                .map_err(db_err)?;
        }
        debug!(entry_id = %entry.id, lines = lines.len(), "journal entry inserted");
        Ok(())
    }

    async fn entry(&mut self, id: JournalEntryId) -> StoreResult<Option<JournalEntry>> {
        journal_entries::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(JournalEntry::try_from)
            .transpose()
    }

    async fn entry_lines(&mut self, id: JournalEntryId) -> StoreResult<Vec<JournalLine>> {
        Ok(journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.eq(id.into_inner()))
            .order_by_asc(journal_lines::Column::LineNumber)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(JournalLine::from)
            .collect())
    }

    async fn find_posted_entry(&mut self, source: SourceRef) -> StoreResult<Option<JournalEntry>> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::SourceType.eq(source.source_type.as_str()))
            .filter(journal_entries::Column::SourceId.eq(source.source_id))
            .filter(journal_entries::Column::Status.eq(EntryStatus::Posted.as_str()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(JournalEntry::try_from)
            .transpose()
    }

    async fn entry_code_exists(&mut self, code: &str) -> StoreResult<bool> {
        let count = journal_entries::Entity::find()
            .filter(journal_entries::Column::Code.eq(code))
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn link_reversal(
        &mut self,
        original: JournalEntryId,
        reversal: JournalEntryId,
    ) -> StoreResult<()> {
        let result = journal_entries::Entity::update_many()
            .col_expr(
                journal_entries::Column::Status,
                Expr::value(EntryStatus::Reversed.as_str()),
            )
            .col_expr(
                journal_entries::Column::ReversedBy,
                Expr::value(reversal.into_inner()),
            )
            .filter(journal_entries::Column::Id.eq(original.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "journal entry", original)?;

        let result = journal_entries::Entity::update_many()
            .col_expr(
                journal_entries::Column::ReversalOf,
                Expr::value(original.into_inner()),
            )
            .filter(journal_entries::Column::Id.eq(reversal.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "journal entry", reversal)
    }

    async fn entries_between(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<JournalEntry>> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::EntryDate.between(start, end))
            .order_by_asc(journal_entries::Column::EntryDate)
            .order_by_asc(journal_entries::Column::Code)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(JournalEntry::try_from)
            .collect()
    }

    // ========== Cash & Bank ==========

    async fn cash_bank(&mut self, id: CashBankId) -> StoreResult<Option<CashBank>> {
        Ok(cash_banks::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(CashBank::from))
    }

    async fn active_cash_banks(&mut self) -> StoreResult<Vec<CashBank>> {
        Ok(cash_banks::Entity::find()
            .filter(cash_banks::Column::IsActive.eq(true))
            .order_by_asc(cash_banks::Column::Code)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(CashBank::from)
            .collect())
    }

    async fn update_cash_bank(&mut self, cash_bank: &CashBank) -> StoreResult<()> {
        let result = cash_banks::Entity::update_many()
            .col_expr(cash_banks::Column::Balance, Expr::value(cash_bank.balance))
            .col_expr(
                cash_banks::Column::AccountId,
                Expr::value(cash_bank.account_id.map(|id| id.into_inner())),
            )
            .filter(cash_banks::Column::Id.eq(cash_bank.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "cash/bank", cash_bank.id)
    }

    async fn cash_bank_transaction_sum(&mut self, id: CashBankId) -> StoreResult<Decimal> {
        let total: Option<Option<Decimal>> = cash_bank_transactions::Entity::find()
            .select_only()
            .column_as(cash_bank_transactions::Column::Amount.sum(), "total")
            .filter(cash_bank_transactions::Column::CashBankId.eq(id.into_inner()))
            .filter(cash_bank_transactions::Column::DeletedAt.is_null())
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(total.flatten().unwrap_or_default())
    }

    async fn insert_cash_bank_transaction(
        &mut self,
        transaction: &CashBankTransaction,
    ) -> StoreResult<()> {
        cash_bank_transaction_active(transaction)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn cash_bank_transaction(
        &mut self,
        id: CashBankTransactionId,
    ) -> StoreResult<Option<CashBankTransaction>> {
        cash_bank_transactions::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(CashBankTransaction::try_from)
            .transpose()
    }

    async fn soft_delete_cash_bank_transaction(
        &mut self,
        id: CashBankTransactionId,
        deleted_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = cash_bank_transactions::Entity::update_many()
            .col_expr(
                cash_bank_transactions::Column::DeletedAt,
                Expr::value(deleted_at.fixed_offset()),
            )
            .filter(cash_bank_transactions::Column::Id.eq(id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "cash/bank transaction", id)
    }

    // ========== Sales & Purchases ==========

    async fn sale(&mut self, id: SaleId) -> StoreResult<Option<Sale>> {
        sales::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(Sale::try_from)
            .transpose()
    }

    async fn update_sale_settlement(&mut self, sale: &Sale) -> StoreResult<()> {
        let result = sales::Entity::update_many()
            .col_expr(sales::Column::Status, Expr::value(sale.status.as_str()))
            .col_expr(
                sales::Column::PaidAmount,
                Expr::value(sale.settlement.paid_amount),
            )
            .col_expr(
                sales::Column::OutstandingAmount,
                Expr::value(sale.settlement.outstanding_amount),
            )
            .col_expr(
                sales::Column::PaymentStatus,
                Expr::value(sale.settlement.status.as_str()),
            )
            .filter(sales::Column::Id.eq(sale.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "sale", sale.id)
    }

    async fn purchase(&mut self, id: PurchaseId) -> StoreResult<Option<Purchase>> {
        purchases::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(Purchase::try_from)
            .transpose()
    }

    async fn update_purchase_settlement(&mut self, purchase: &Purchase) -> StoreResult<()> {
        let result = purchases::Entity::update_many()
            .col_expr(
                purchases::Column::Status,
                Expr::value(purchase.status.as_str()),
            )
            .col_expr(
                purchases::Column::PaidAmount,
                Expr::value(purchase.settlement.paid_amount),
            )
            .col_expr(
                purchases::Column::OutstandingAmount,
                Expr::value(purchase.settlement.outstanding_amount),
            )
            .col_expr(
                purchases::Column::PaymentStatus,
                Expr::value(purchase.settlement.status.as_str()),
            )
            .filter(purchases::Column::Id.eq(purchase.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "purchase", purchase.id)
    }

    // ========== Payments ==========

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        payment_active(payment)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn payment(&mut self, id: PaymentId) -> StoreResult<Option<Payment>> {
        payments::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(Payment::try_from)
            .transpose()
    }

    async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        let result = payments::Entity::update_many()
            .col_expr(payments::Column::Status, Expr::value(payment.status.as_str()))
            .col_expr(
                payments::Column::JournalEntryId,
                Expr::value(payment.journal_entry_id.map(|id| id.into_inner())),
            )
            .col_expr(payments::Column::Notes, Expr::value(payment.notes.clone()))
            .filter(payments::Column::Id.eq(payment.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        ensure_updated(result.rows_affected, "payment", payment.id)
    }

    async fn insert_allocation(&mut self, allocation: &PaymentAllocation) -> StoreResult<()> {
        allocation_active(allocation)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn allocations_for_payment(&mut self, id: PaymentId) -> StoreResult<Vec<PaymentAllocation>> {
        payment_allocations::Entity::find()
            .filter(payment_allocations::Column::PaymentId.eq(id.into_inner()))
            .order_by_asc(payment_allocations::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(PaymentAllocation::try_from)
            .collect()
    }

    // ========== Accounting periods ==========

    async fn accounting_periods(&mut self) -> StoreResult<Vec<AccountingPeriod>> {
        accounting_periods::Entity::find()
            .order_by_asc(accounting_periods::Column::StartDate)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(AccountingPeriod::try_from)
            .collect()
    }

    async fn insert_period(&mut self, period: &AccountingPeriod) -> StoreResult<()> {
        period_active(period)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_period(&mut self, period: &AccountingPeriod) -> StoreResult<()> {
        period_active(period)
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // ========== Boundary ==========

    async fn commit(self) -> StoreResult<()> {
        self.txn.commit().await.map_err(db_err)
    }
}
