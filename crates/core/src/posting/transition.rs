//! Status-transition decisions for posted documents.
//!
//! Posted entries are never patched. A document whose amounts changed gets
//! its entry reversed and a fresh one posted.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use neraca_shared::types::AccountId;

use crate::ledger::types::LineInput;

/// What to do with a document's journal after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    /// Newly qualifies: post an entry.
    Create,
    /// No longer qualifies: reverse the existing entry.
    Reverse,
    /// Still qualifies but amounts or accounts changed: reverse, then post.
    Recreate,
    /// Still qualifies and the entry already matches.
    Keep,
    /// Does not qualify and has no entry.
    Skip,
}

impl TransitionAction {
    /// Decides the action from the existing entry's lines and the proposed
    /// lines (`None` when the document does not qualify).
    #[must_use]
    pub fn decide(existing: Option<&[LineInput]>, proposed: Option<&[LineInput]>) -> Self {
        match (existing, proposed) {
            (None, None) => Self::Skip,
            (None, Some(_)) => Self::Create,
            (Some(_), None) => Self::Reverse,
            (Some(existing), Some(proposed)) => {
                if same_effect(existing, proposed) {
                    Self::Keep
                } else {
                    Self::Recreate
                }
            }
        }
    }
}

fn effect_key(line: &LineInput) -> (AccountId, Decimal, Decimal) {
    (line.account_id, line.debit, line.credit)
}

fn by_effect(a: &LineInput, b: &LineInput) -> Ordering {
    effect_key(a).cmp(&effect_key(b))
}

/// True if both line sets hit the same accounts with the same amounts,
/// ignoring order and descriptions.
fn same_effect(a: &[LineInput], b: &[LineInput]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&LineInput> = a.iter().collect();
    let mut b: Vec<&LineInput> = b.iter().collect();
    a.sort_by(|x, y| by_effect(x, y));
    b.sort_by(|x, y| by_effect(x, y));
    a.iter().zip(&b).all(|(x, y)| effect_key(x) == effect_key(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lines(cash: AccountId, revenue: AccountId, amount: Decimal) -> Vec<LineInput> {
        vec![
            LineInput::debit(cash, amount, "cash"),
            LineInput::credit(revenue, amount, "revenue"),
        ]
    }

    #[test]
    fn test_decisions() {
        let (cash, revenue) = (AccountId::new(), AccountId::new());
        let old = lines(cash, revenue, dec!(100));
        let same = lines(cash, revenue, dec!(100.00));
        let changed = lines(cash, revenue, dec!(120));

        assert_eq!(TransitionAction::decide(None, None), TransitionAction::Skip);
        assert_eq!(TransitionAction::decide(None, Some(&old)), TransitionAction::Create);
        assert_eq!(TransitionAction::decide(Some(&old), None), TransitionAction::Reverse);
        assert_eq!(TransitionAction::decide(Some(&old), Some(&same)), TransitionAction::Keep);
        assert_eq!(
            TransitionAction::decide(Some(&old), Some(&changed)),
            TransitionAction::Recreate
        );
    }

    #[test]
    fn test_order_and_descriptions_ignored() {
        let (cash, revenue) = (AccountId::new(), AccountId::new());
        let old = lines(cash, revenue, dec!(100));
        let mut reordered: Vec<LineInput> = old.iter().rev().cloned().collect();
        reordered[0].description = "something else".into();
        assert_eq!(
            TransitionAction::decide(Some(&old), Some(&reordered)),
            TransitionAction::Keep
        );
    }

    #[test]
    fn test_account_change_recreates() {
        let (cash, bank, revenue) = (AccountId::new(), AccountId::new(), AccountId::new());
        assert_eq!(
            TransitionAction::decide(
                Some(&lines(cash, revenue, dec!(100))),
                Some(&lines(bank, revenue, dec!(100)))
            ),
            TransitionAction::Recreate
        );
    }
}
