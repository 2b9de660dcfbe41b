//! Account balance propagation.
//!
//! Leaf accounts move by the normal-balance change of each line. Header
//! accounts are never posted to; after any leaf changes, every ancestor is
//! recomputed bottom-up as the sum of its direct children.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use tracing::debug;

use neraca_shared::types::AccountId;

use super::error::{LedgerError, LedgerResult};
use super::types::{Account, LineInput};
use crate::store::UnitOfWork;

/// Accumulates the per-account balance change of a set of lines.
///
/// `accounts` must contain every account referenced by `lines`.
/// The returned order follows the first appearance of each account.
#[must_use]
pub fn balance_deltas(
    lines: &[LineInput],
    accounts: &HashMap<AccountId, Account>,
) -> Vec<(AccountId, Decimal)> {
    let mut order = Vec::new();
    let mut totals: HashMap<AccountId, Decimal> = HashMap::new();
    for line in lines {
        let Some(account) = accounts.get(&line.account_id) else {
            continue;
        };
        let change = account.account_type.balance_change(line.debit, line.credit);
        totals
            .entry(line.account_id)
            .and_modify(|total| *total += change)
            .or_insert_with(|| {
                order.push(line.account_id);
                change
            });
    }
    order
        .into_iter()
        .map(|id| (id, totals.get(&id).copied().unwrap_or_default()))
        .collect()
}

/// Recomputes every ancestor header of the given accounts.
///
/// Each chain is walked iteratively through single-parent links. A parent
/// seen twice in the same chain is a cycle and aborts the operation.
///
/// # Errors
///
/// Returns `HierarchyCycle` or `AccountNotFound`, or a storage error.
pub async fn roll_up_ancestors<U: UnitOfWork>(
    uow: &mut U,
    touched: &[AccountId],
) -> LedgerResult<()> {
    for &start in touched {
        let account = uow
            .account(start)
            .await?
            .ok_or(LedgerError::AccountNotFound(start))?;

        let mut seen = HashSet::from([start]);
        let mut next = account.parent_id;
        while let Some(parent_id) = next {
            if !seen.insert(parent_id) {
                return Err(LedgerError::HierarchyCycle(parent_id));
            }
            let parent = uow
                .account(parent_id)
                .await?
                .ok_or(LedgerError::AccountNotFound(parent_id))?;
            let sum = uow.child_balance_sum(parent_id).await?;
            uow.set_account_balance(parent_id, sum).await?;
            debug!(account_id = %parent_id, balance = %sum, "header balance recomputed");
            next = parent.parent_id;
        }
    }
    Ok(())
}

/// Sets an account's balance outright, then rolls up its ancestors.
///
/// Used where a balance is re-derived from a source of truth rather than
/// moved by journal lines.
///
/// # Errors
///
/// Propagates storage and hierarchy errors.
pub async fn set_balance_and_roll_up<U: UnitOfWork>(
    uow: &mut U,
    account_id: AccountId,
    balance: Decimal,
) -> LedgerResult<()> {
    uow.set_account_balance(account_id, balance).await?;
    roll_up_ancestors(uow, &[account_id]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::AccountType;
    use crate::store::{LedgerStore, MemoryStore};
    use rust_decimal_macros::dec;

    fn account(code: &str, account_type: AccountType, parent_id: Option<AccountId>) -> Account {
        Account {
            id: AccountId::new(),
            code: code.into(),
            name: code.into(),
            account_type,
            parent_id,
            balance: Decimal::ZERO,
            is_header: false,
            is_active: true,
        }
    }

    #[test]
    fn test_deltas_respect_polarity_and_merge() {
        let cash = account("1101", AccountType::Asset, None);
        let revenue = account("4101", AccountType::Revenue, None);
        let accounts = HashMap::from([(cash.id, cash.clone()), (revenue.id, revenue.clone())]);
        let lines = vec![
            LineInput::debit(cash.id, dec!(100), ""),
            LineInput::credit(revenue.id, dec!(100), ""),
            LineInput::credit(cash.id, dec!(30), ""),
            LineInput::debit(revenue.id, dec!(30), ""),
        ];

        let deltas = balance_deltas(&lines, &accounts);
        assert_eq!(deltas, vec![(cash.id, dec!(70)), (revenue.id, dec!(70))]);
    }

    #[tokio::test]
    async fn test_deep_hierarchy_rolls_up() {
        let store = MemoryStore::new();
        let root = Account {
            is_header: true,
            ..account("1", AccountType::Asset, None)
        };
        let mid = Account {
            is_header: true,
            ..account("11", AccountType::Asset, Some(root.id))
        };
        let low = Account {
            is_header: true,
            ..account("110", AccountType::Asset, Some(mid.id))
        };
        let leaf = Account {
            balance: dec!(75),
            ..account("1101", AccountType::Asset, Some(low.id))
        };
        let sibling = Account {
            balance: dec!(25),
            ..account("12", AccountType::Asset, Some(root.id))
        };
        for a in [&root, &mid, &low, &leaf, &sibling] {
            store.insert_account(a.clone()).await;
        }

        let mut uow = store.begin().await.unwrap();
        roll_up_ancestors(&mut uow, &[leaf.id]).await.unwrap();
        uow.commit().await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.accounts[&low.id].balance, dec!(75));
        assert_eq!(state.accounts[&mid.id].balance, dec!(75));
        assert_eq!(state.accounts[&root.id].balance, dec!(100));
    }

    #[tokio::test]
    async fn test_cycle_is_rejected() {
        let store = MemoryStore::new();
        let a_id = AccountId::new();
        let b = Account {
            is_header: true,
            ..account("B", AccountType::Asset, Some(a_id))
        };
        let a = Account {
            id: a_id,
            is_header: true,
            ..account("A", AccountType::Asset, Some(b.id))
        };
        let leaf = account("L", AccountType::Asset, Some(a_id));
        for acc in [&a, &b, &leaf] {
            store.insert_account(acc.clone()).await;
        }

        let mut uow = store.begin().await.unwrap();
        let err = roll_up_ancestors(&mut uow, &[leaf.id]).await.unwrap_err();
        assert!(matches!(err, LedgerError::HierarchyCycle(_)));
    }
}
