//! Cash/bank ⇄ chart-of-accounts synchronizer.
//!
//! Non-deleted subsidiary transactions are the source of truth. A sync sets
//! both the register balance and its linked account balance to their sum and
//! rolls the account's headers up, all in one unit of work.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use neraca_shared::types::{AccountId, CashBankId, CashBankTransactionId};

use super::error::{CashBankError, CashBankResult};
use super::types::{
    CashBank, CashBankTransaction, Discrepancy, DiscrepancyKind, NewCashBankTransaction,
};
use crate::ledger::balance::set_balance_and_roll_up;
use crate::ledger::types::AccountType;
use crate::observability::LedgerMetrics;
use crate::store::{LedgerStore, UnitOfWork};

/// Keeps registers, their linked accounts, and their transactions in agreement.
pub struct CashBankSynchronizer<S> {
    store: Arc<S>,
    epsilon: Decimal,
    metrics: Arc<dyn LedgerMetrics>,
}

impl<S> std::fmt::Debug for CashBankSynchronizer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CashBankSynchronizer")
            .field("epsilon", &self.epsilon)
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStore> CashBankSynchronizer<S> {
    /// Creates a synchronizer. `epsilon` is the tolerance used when
    /// classifying drift.
    #[must_use]
    pub fn new(store: Arc<S>, epsilon: Decimal, metrics: Arc<dyn LedgerMetrics>) -> Self {
        Self {
            store,
            epsilon,
            metrics,
        }
    }

    /// Re-derives a register and its linked account from the transaction sum.
    ///
    /// Returns the new balance, or `None` if the register is not linked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a storage error.
    #[instrument(skip(self))]
    pub async fn sync(&self, id: CashBankId) -> CashBankResult<Option<Decimal>> {
        let started = Instant::now();
        let mut uow = self.store.begin().await?;
        let balance = sync_in(&mut uow, id).await?;
        uow.commit().await?;
        self.metrics.record_timing("cashbank.sync", started.elapsed());
        Ok(balance)
    }

    /// Links a register to an ASSET account and syncs it immediately.
    ///
    /// A previous link is released first, which resets the old account to
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `AccountNotFound`, `AccountNotAsset`,
    /// `HeaderAccount`, `AccountAlreadyLinked`, or a storage error.
    #[instrument(skip(self))]
    pub async fn link(&self, id: CashBankId, account_id: AccountId) -> CashBankResult<Decimal> {
        let mut uow = self.store.begin().await?;
        let mut cash_bank = load(&mut uow, id).await?;

        let account = uow
            .account(account_id)
            .await?
            .ok_or(CashBankError::AccountNotFound(account_id))?;
        if account.account_type != AccountType::Asset {
            warn!(%account_id, account_type = %account.account_type, "link rejected");
            return Err(CashBankError::AccountNotAsset {
                account: account_id,
                actual: account.account_type,
            });
        }
        if account.is_header {
            return Err(CashBankError::HeaderAccount(account_id));
        }
        let holder = uow
            .active_cash_banks()
            .await?
            .into_iter()
            .find(|other| other.id != id && other.account_id == Some(account_id));
        if let Some(holder) = holder {
            return Err(CashBankError::AccountAlreadyLinked {
                account: account_id,
                linked_to: holder.id,
            });
        }

        if let Some(previous) = cash_bank.account_id.filter(|prev| *prev != account_id) {
            warn!(cash_bank = %cash_bank.code, %previous, "replacing existing link");
            set_balance_and_roll_up(&mut uow, previous, Decimal::ZERO).await?;
        }
        cash_bank.account_id = Some(account_id);
        uow.update_cash_bank(&cash_bank).await?;
        let balance = sync_in(&mut uow, id).await?.unwrap_or_default();
        uow.commit().await?;

        info!(cash_bank = %cash_bank.code, account = %account.code, %balance, "cash/bank linked");
        Ok(balance)
    }

    /// Removes a register's link and resets the released account to zero.
    ///
    /// Returns the released account. Callers are responsible for reviewing
    /// any non-zero balance this discards.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `NotLinked`, or a storage error.
    #[instrument(skip(self))]
    pub async fn unlink(&self, id: CashBankId) -> CashBankResult<AccountId> {
        let mut uow = self.store.begin().await?;
        let mut cash_bank = load(&mut uow, id).await?;
        let account_id = cash_bank.account_id.ok_or(CashBankError::NotLinked(id))?;

        if let Some(account) = uow.account(account_id).await? {
            if !account.balance.is_zero() {
                warn!(
                    cash_bank = %cash_bank.code,
                    account = %account.code,
                    balance = %account.balance,
                    "unlink discards a non-zero account balance"
                );
            }
        }
        cash_bank.account_id = None;
        uow.update_cash_bank(&cash_bank).await?;
        set_balance_and_roll_up(&mut uow, account_id, Decimal::ZERO).await?;
        uow.commit().await?;

        info!(cash_bank = %cash_bank.code, %account_id, "cash/bank unlinked");
        Ok(account_id)
    }

    /// Syncs every linked active register, each in its own unit of work.
    ///
    /// A register that fails to sync is logged and skipped. Returns the
    /// number synced.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the register list cannot be read.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> CashBankResult<usize> {
        let linked: Vec<CashBank> = {
            let mut uow = self.store.begin().await?;
            uow.active_cash_banks()
                .await?
                .into_iter()
                .filter(|cb| cb.account_id.is_some())
                .collect()
        };

        let mut synced = 0;
        for cash_bank in linked {
            match self.sync(cash_bank.id).await {
                Ok(_) => synced += 1,
                Err(err) => error!(cash_bank = %cash_bank.code, error = %err, "sync failed"),
            }
        }
        info!(synced, "cash/bank sweep finished");
        Ok(synced)
    }

    /// Classifies every active register. Read-only.
    ///
    /// Rows come back in register-code order and include `SyncOk` rows.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn find_discrepancies(&self) -> CashBankResult<Vec<Discrepancy>> {
        let mut uow = self.store.begin().await?;
        let mut report = Vec::new();
        for cash_bank in uow.active_cash_banks().await? {
            let account = match cash_bank.account_id {
                Some(account_id) => uow.account(account_id).await?,
                None => None,
            };
            let transaction_sum = uow.cash_bank_transaction_sum(cash_bank.id).await?;
            let account_balance = account.as_ref().map(|a| a.balance);
            let kind = DiscrepancyKind::classify(
                cash_bank.balance,
                account_balance,
                transaction_sum,
                self.epsilon,
            );
            if kind != DiscrepancyKind::SyncOk {
                warn!(
                    cash_bank = %cash_bank.code,
                    kind = kind.as_str(),
                    balance = %cash_bank.balance,
                    account_balance = ?account_balance,
                    %transaction_sum,
                    "cash/bank drift detected"
                );
            }
            report.push(Discrepancy {
                cash_bank_id: cash_bank.id,
                cash_bank_code: cash_bank.code,
                cash_bank_balance: cash_bank.balance,
                account_id: account.as_ref().map(|a| a.id),
                account_code: account.map(|a| a.code),
                account_balance,
                transaction_sum,
                kind,
            });
        }

        let drifted = report
            .iter()
            .filter(|d| d.kind != DiscrepancyKind::SyncOk)
            .count();
        self.metrics.record_discrepancies(drifted);
        Ok(report)
    }

    /// Repairs every auto-fixable discrepancy by syncing it.
    ///
    /// Unlinked registers are reported, never changed. Returns the number
    /// of registers fixed.
    ///
    /// # Errors
    ///
    /// Returns the first sync failure. Registers fixed before it stay fixed.
    #[instrument(skip(self))]
    pub async fn auto_fix(&self) -> CashBankResult<usize> {
        let mut fixed = 0;
        for discrepancy in self.find_discrepancies().await? {
            match discrepancy.kind {
                kind if kind.is_auto_fixable() => {
                    self.sync(discrepancy.cash_bank_id).await?;
                    fixed += 1;
                }
                DiscrepancyKind::NotLinked => {
                    warn!(cash_bank = %discrepancy.cash_bank_code, "not linked, needs manual linking");
                }
                _ => {}
            }
        }
        self.metrics.record_auto_fix(fixed);
        info!(fixed, "cash/bank auto-fix finished");
        Ok(fixed)
    }

    /// Appends a subsidiary transaction and moves the register balance.
    ///
    /// The linked account is not touched; it follows on the next sync or
    /// through the journal of the originating document.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount`, `NotFound`, or a storage error.
    #[instrument(skip(self, input), fields(cash_bank_id = %input.cash_bank_id, amount = %input.amount))]
    pub async fn record_transaction(
        &self,
        input: NewCashBankTransaction,
    ) -> CashBankResult<CashBankTransaction> {
        let mut uow = self.store.begin().await?;
        let transaction = append_transaction_in(&mut uow, input).await?;
        uow.commit().await?;
        Ok(transaction)
    }

    /// Marks a subsidiary transaction deleted so later syncs exclude it.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `TransactionDeleted`, or a storage error.
    #[instrument(skip(self))]
    pub async fn soft_delete_transaction(&self, id: CashBankTransactionId) -> CashBankResult<()> {
        let mut uow = self.store.begin().await?;
        let transaction = uow
            .cash_bank_transaction(id)
            .await?
            .ok_or(CashBankError::TransactionNotFound(id))?;
        if transaction.deleted_at.is_some() {
            return Err(CashBankError::TransactionDeleted(id));
        }
        uow.soft_delete_cash_bank_transaction(id, Utc::now()).await?;
        uow.commit().await?;
        debug!(transaction_id = %id, "cash/bank transaction soft-deleted");
        Ok(())
    }
}

async fn load<U: UnitOfWork>(uow: &mut U, id: CashBankId) -> CashBankResult<CashBank> {
    uow.cash_bank(id).await?.ok_or(CashBankError::NotFound(id))
}

/// Sync inside the caller's unit of work.
///
/// # Errors
///
/// Returns `NotFound` or a storage error.
pub async fn sync_in<U: UnitOfWork>(uow: &mut U, id: CashBankId) -> CashBankResult<Option<Decimal>> {
    let mut cash_bank = load(uow, id).await?;
    let Some(account_id) = cash_bank.account_id else {
        debug!(cash_bank = %cash_bank.code, "not linked, sync skipped");
        return Ok(None);
    };

    let transaction_sum = uow.cash_bank_transaction_sum(id).await?;
    if cash_bank.balance != transaction_sum {
        debug!(cash_bank = %cash_bank.code, from = %cash_bank.balance, to = %transaction_sum, "register balance corrected");
    }
    cash_bank.balance = transaction_sum;
    uow.update_cash_bank(&cash_bank).await?;
    set_balance_and_roll_up(uow, account_id, transaction_sum).await?;
    Ok(Some(transaction_sum))
}

/// Appends a subsidiary transaction inside the caller's unit of work.
///
/// # Errors
///
/// Returns `ZeroAmount`, `NotFound`, or a storage error.
pub async fn append_transaction_in<U: UnitOfWork>(
    uow: &mut U,
    input: NewCashBankTransaction,
) -> CashBankResult<CashBankTransaction> {
    if input.amount.is_zero() {
        return Err(CashBankError::ZeroAmount);
    }
    let mut cash_bank = load(uow, input.cash_bank_id).await?;
    cash_bank.balance += input.amount;

    let transaction = CashBankTransaction {
        id: CashBankTransactionId::new(),
        cash_bank_id: cash_bank.id,
        amount: input.amount,
        balance_after: cash_bank.balance,
        reference_type: input.reference_type,
        reference_id: input.reference_id,
        transaction_date: input.transaction_date,
        notes: input.notes,
        deleted_at: None,
    };
    uow.insert_cash_bank_transaction(&transaction).await?;
    uow.update_cash_bank(&cash_bank).await?;
    Ok(transaction)
}
