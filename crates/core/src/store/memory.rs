//! In-memory implementation of the storage seam.
//!
//! Units of work are serialized through an async mutex. Each unit mutates a
//! private working copy of the state and publishes it on commit, so a dropped
//! unit leaves the shared state untouched.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use neraca_shared::types::{
    AccountId, CashBankId, CashBankTransactionId, JournalEntryId, PaymentId, PurchaseId, SaleId,
};

use super::{LedgerStore, StoreError, StoreResult, UnitOfWork};
use crate::cashbank::{CashBank, CashBankTransaction};
use crate::closing::AccountingPeriod;
use crate::documents::{Purchase, Sale};
use crate::ledger::types::{
    Account, AccountType, EntryStatus, JournalEntry, JournalLine, SourceRef,
};
use crate::payment::{Payment, PaymentAllocation};

/// Complete ledger state held by [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    /// Chart of accounts.
    pub accounts: HashMap<AccountId, Account>,
    /// Journal entry headers.
    pub entries: HashMap<JournalEntryId, JournalEntry>,
    /// Journal lines keyed by entry.
    pub lines: HashMap<JournalEntryId, Vec<JournalLine>>,
    /// Cash/bank registers.
    pub cash_banks: HashMap<CashBankId, CashBank>,
    /// Subsidiary transactions in insertion order.
    pub cash_bank_transactions: Vec<CashBankTransaction>,
    /// Sales invoices.
    pub sales: HashMap<SaleId, Sale>,
    /// Purchase bills.
    pub purchases: HashMap<PurchaseId, Purchase>,
    /// Payments.
    pub payments: HashMap<PaymentId, Payment>,
    /// Payment allocations in insertion order.
    pub allocations: Vec<PaymentAllocation>,
    /// Accounting periods in insertion order.
    pub periods: Vec<AccountingPeriod>,
}

impl MemoryState {
    /// Returns the entries that reference `source`, in any status.
    #[must_use]
    pub fn entries_for(&self, source: SourceRef) -> Vec<&JournalEntry> {
        self.entries
            .values()
            .filter(|entry| entry.source == Some(source))
            .collect()
    }
}

/// Shared in-memory ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Seeds an account.
    pub async fn insert_account(&self, account: Account) {
        self.state.lock().await.accounts.insert(account.id, account);
    }

    /// Seeds a cash/bank register.
    pub async fn insert_cash_bank(&self, cash_bank: CashBank) {
        self.state
            .lock()
            .await
            .cash_banks
            .insert(cash_bank.id, cash_bank);
    }

    /// Seeds a sales invoice.
    pub async fn insert_sale(&self, sale: Sale) {
        self.state.lock().await.sales.insert(sale.id, sale);
    }

    /// Seeds a purchase bill.
    pub async fn insert_purchase(&self, purchase: Purchase) {
        self.state.lock().await.purchases.insert(purchase.id, purchase);
    }

    /// Seeds a journal entry with its lines, bypassing the posting pipeline.
    pub async fn insert_raw_entry(&self, entry: JournalEntry, lines: Vec<JournalLine>) {
        let mut state = self.state.lock().await;
        state.lines.insert(entry.id, lines);
        state.entries.insert(entry.id, entry);
    }

    /// Overwrites a sale, e.g. to simulate a status change by another service.
    pub async fn replace_sale(&self, sale: Sale) {
        self.insert_sale(sale).await;
    }

    /// Overwrites a purchase.
    pub async fn replace_purchase(&self, purchase: Purchase) {
        self.insert_purchase(purchase).await;
    }
}

impl LedgerStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> StoreResult<MemoryUnit> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnit { guard, working })
    }
}

/// Unit of work over [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn missing(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::Missing(format!("{what} {id}"))
}

impl UnitOfWork for MemoryUnit {
    async fn account(&mut self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn account_by_code(&mut self, code: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .working
            .accounts
            .values()
            .find(|account| account.code == code)
            .cloned())
    }

    async fn accounts_of_type(&mut self, account_type: AccountType) -> StoreResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .working
            .accounts
            .values()
            .filter(|account| account.account_type == account_type)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn child_balance_sum(&mut self, parent_id: AccountId) -> StoreResult<Decimal> {
        Ok(self
            .working
            .accounts
            .values()
            .filter(|account| account.parent_id == Some(parent_id))
            .map(|account| account.balance)
            .sum())
    }

    async fn set_account_balance(&mut self, id: AccountId, balance: Decimal) -> StoreResult<()> {
        let account = self
            .working
            .accounts
            .get_mut(&id)
            .ok_or_else(|| missing("account", id))?;
        account.balance = balance;
        Ok(())
    }

    async fn insert_entry(&mut self, entry: JournalEntry, lines: Vec<JournalLine>) -> StoreResult<()> {
        if self.working.entries.values().any(|e| e.code == entry.code) {
            return Err(StoreError::UniqueViolation(format!(
                "journal entry code {}",
                entry.code
            )));
        }
        if entry.status == EntryStatus::Posted {
            if let Some(source) = entry.source {
                let taken = self
                    .working
                    .entries
                    .values()
                    .any(|e| e.status == EntryStatus::Posted && e.source == Some(source));
                if taken {
                    return Err(StoreError::UniqueViolation(format!(
                        "posted journal entry for {source}"
                    )));
                }
            }
        }
        self.working.lines.insert(entry.id, lines);
        self.working.entries.insert(entry.id, entry);
        Ok(())
    }

    async fn entry(&mut self, id: JournalEntryId) -> StoreResult<Option<JournalEntry>> {
        Ok(self.working.entries.get(&id).cloned())
    }

    async fn entry_lines(&mut self, id: JournalEntryId) -> StoreResult<Vec<JournalLine>> {
        let mut lines = self.working.lines.get(&id).cloned().unwrap_or_default();
        lines.sort_by_key(|line| line.line_number);
        Ok(lines)
    }

    async fn find_posted_entry(&mut self, source: SourceRef) -> StoreResult<Option<JournalEntry>> {
        Ok(self
            .working
            .entries
            .values()
            .find(|e| e.status == EntryStatus::Posted && e.source == Some(source))
            .cloned())
    }

    async fn entry_code_exists(&mut self, code: &str) -> StoreResult<bool> {
        Ok(self.working.entries.values().any(|e| e.code == code))
    }

    async fn link_reversal(
        &mut self,
        original: JournalEntryId,
        reversal: JournalEntryId,
    ) -> StoreResult<()> {
        let reversal_entry = self
            .working
            .entries
            .get_mut(&reversal)
            .ok_or_else(|| missing("journal entry", reversal))?;
        reversal_entry.reversal_of = Some(original);

        let original_entry = self
            .working
            .entries
            .get_mut(&original)
            .ok_or_else(|| missing("journal entry", original))?;
        original_entry.status = EntryStatus::Reversed;
        original_entry.reversed_by = Some(reversal);
        Ok(())
    }

    async fn entries_between(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<JournalEntry>> {
        let mut entries: Vec<JournalEntry> = self
            .working
            .entries
            .values()
            .filter(|e| e.entry_date >= start && e.entry_date <= end)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.entry_date.cmp(&b.entry_date).then(a.code.cmp(&b.code)));
        Ok(entries)
    }

    async fn cash_bank(&mut self, id: CashBankId) -> StoreResult<Option<CashBank>> {
        Ok(self.working.cash_banks.get(&id).cloned())
    }

    async fn active_cash_banks(&mut self) -> StoreResult<Vec<CashBank>> {
        let mut cash_banks: Vec<CashBank> = self
            .working
            .cash_banks
            .values()
            .filter(|cb| cb.is_active)
            .cloned()
            .collect();
        cash_banks.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(cash_banks)
    }

    async fn update_cash_bank(&mut self, cash_bank: &CashBank) -> StoreResult<()> {
        let stored = self
            .working
            .cash_banks
            .get_mut(&cash_bank.id)
            .ok_or_else(|| missing("cash/bank", cash_bank.id))?;
        stored.clone_from(cash_bank);
        Ok(())
    }

    async fn cash_bank_transaction_sum(&mut self, id: CashBankId) -> StoreResult<Decimal> {
        Ok(self
            .working
            .cash_bank_transactions
            .iter()
            .filter(|tx| tx.cash_bank_id == id && tx.deleted_at.is_none())
            .map(|tx| tx.amount)
            .sum())
    }

    async fn insert_cash_bank_transaction(
        &mut self,
        transaction: &CashBankTransaction,
    ) -> StoreResult<()> {
        self.working
            .cash_bank_transactions
            .push(transaction.clone());
        Ok(())
    }

    async fn cash_bank_transaction(
        &mut self,
        id: CashBankTransactionId,
    ) -> StoreResult<Option<CashBankTransaction>> {
        Ok(self
            .working
            .cash_bank_transactions
            .iter()
            .find(|tx| tx.id == id)
            .cloned())
    }

    async fn soft_delete_cash_bank_transaction(
        &mut self,
        id: CashBankTransactionId,
        deleted_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let tx = self
            .working
            .cash_bank_transactions
            .iter_mut()
            .find(|tx| tx.id == id)
            .ok_or_else(|| missing("cash/bank transaction", id))?;
        tx.deleted_at = Some(deleted_at);
        Ok(())
    }

    async fn sale(&mut self, id: SaleId) -> StoreResult<Option<Sale>> {
        Ok(self.working.sales.get(&id).cloned())
    }

    async fn update_sale_settlement(&mut self, sale: &Sale) -> StoreResult<()> {
        let stored = self
            .working
            .sales
            .get_mut(&sale.id)
            .ok_or_else(|| missing("sale", sale.id))?;
        stored.status = sale.status;
        stored.settlement = sale.settlement;
        Ok(())
    }

    async fn purchase(&mut self, id: PurchaseId) -> StoreResult<Option<Purchase>> {
        Ok(self.working.purchases.get(&id).cloned())
    }

    async fn update_purchase_settlement(&mut self, purchase: &Purchase) -> StoreResult<()> {
        let stored = self
            .working
            .purchases
            .get_mut(&purchase.id)
            .ok_or_else(|| missing("purchase", purchase.id))?;
        stored.status = purchase.status;
        stored.settlement = purchase.settlement;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        if self.working.payments.values().any(|p| p.code == payment.code) {
            return Err(StoreError::UniqueViolation(format!(
                "payment code {}",
                payment.code
            )));
        }
        self.working.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn payment(&mut self, id: PaymentId) -> StoreResult<Option<Payment>> {
        Ok(self.working.payments.get(&id).cloned())
    }

    async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        let stored = self
            .working
            .payments
            .get_mut(&payment.id)
            .ok_or_else(|| missing("payment", payment.id))?;
        stored.clone_from(payment);
        Ok(())
    }

    async fn insert_allocation(&mut self, allocation: &PaymentAllocation) -> StoreResult<()> {
        self.working.allocations.push(allocation.clone());
        Ok(())
    }

    async fn allocations_for_payment(&mut self, id: PaymentId) -> StoreResult<Vec<PaymentAllocation>> {
        Ok(self
            .working
            .allocations
            .iter()
            .filter(|allocation| allocation.payment_id == id)
            .cloned()
            .collect())
    }

    async fn accounting_periods(&mut self) -> StoreResult<Vec<AccountingPeriod>> {
        let mut periods = self.working.periods.clone();
        periods.sort_by_key(|period| period.start_date);
        Ok(periods)
    }

    async fn insert_period(&mut self, period: &AccountingPeriod) -> StoreResult<()> {
        self.working.periods.push(period.clone());
        Ok(())
    }

    async fn update_period(&mut self, period: &AccountingPeriod) -> StoreResult<()> {
        let stored = self
            .working
            .periods
            .iter_mut()
            .find(|p| p.id == period.id)
            .ok_or_else(|| missing("accounting period", period.id))?;
        stored.clone_from(period);
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(code: &str) -> Account {
        Account {
            id: AccountId::new(),
            code: code.into(),
            name: code.into(),
            account_type: AccountType::Asset,
            parent_id: None,
            balance: Decimal::ZERO,
            is_header: false,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let cash = account("1101");
        store.insert_account(cash.clone()).await;

        let mut uow = store.begin().await.unwrap();
        uow.set_account_balance(cash.id, dec!(250)).await.unwrap();
        uow.commit().await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.accounts[&cash.id].balance, dec!(250));
    }

    #[tokio::test]
    async fn test_drop_discards_writes() {
        let store = MemoryStore::new();
        let cash = account("1101");
        store.insert_account(cash.clone()).await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.set_account_balance(cash.id, dec!(250)).await.unwrap();
        }

        let state = store.snapshot().await;
        assert_eq!(state.accounts[&cash.id].balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_missing_row_update_fails() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = uow
            .set_account_balance(AccountId::new(), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn test_child_balance_sum() {
        let store = MemoryStore::new();
        let header = Account {
            is_header: true,
            ..account("1100")
        };
        let kas = Account {
            parent_id: Some(header.id),
            balance: dec!(100),
            ..account("1101")
        };
        let bank = Account {
            parent_id: Some(header.id),
            balance: dec!(50),
            ..account("1102")
        };
        store.insert_account(header.clone()).await;
        store.insert_account(kas).await;
        store.insert_account(bank).await;

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.child_balance_sum(header.id).await.unwrap(), dec!(150));
    }
}
