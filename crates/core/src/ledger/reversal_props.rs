//! Property-based tests for reversing entry construction.

use neraca_shared::types::{AccountId, JournalEntryId, JournalLineId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::reversal::ReversalService;
use super::types::JournalLine;
use super::validation::LineTotals;

/// Strategy for generating random positive Decimal amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for a balanced entry: N debits offset by one credit.
fn arb_balanced_lines() -> impl Strategy<Value = Vec<JournalLine>> {
    prop::collection::vec(arb_amount(), 1..6).prop_map(|amounts| {
        let entry_id = JournalEntryId::new();
        let total: Decimal = amounts.iter().copied().sum();
        let mut lines: Vec<JournalLine> = amounts
            .into_iter()
            .enumerate()
            .map(|(i, amount)| JournalLine {
                id: JournalLineId::new(),
                entry_id,
                account_id: AccountId::new(),
                line_number: i32::try_from(i + 1).unwrap(),
                description: format!("debit {i}"),
                debit: amount,
                credit: Decimal::ZERO,
            })
            .collect();
        lines.push(JournalLine {
            id: JournalLineId::new(),
            entry_id,
            account_id: AccountId::new(),
            line_number: i32::try_from(lines.len() + 1).unwrap(),
            description: "credit".into(),
            debit: Decimal::ZERO,
            credit: total,
        });
        lines
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The reversal of a balanced entry is balanced.
    #[test]
    fn prop_reversal_is_balanced(original in arb_balanced_lines()) {
        let reversed = ReversalService::reversing_lines(&original);
        let totals = LineTotals::of(&reversed);
        prop_assert_eq!(totals.debit, totals.credit);
    }

    /// Original plus reversal nets to zero on every account.
    #[test]
    fn prop_reversal_nets_to_zero(original in arb_balanced_lines()) {
        let reversed = ReversalService::reversing_lines(&original);
        prop_assert_eq!(reversed.len(), original.len());
        for (orig, rev) in original.iter().zip(&reversed) {
            prop_assert_eq!(orig.account_id, rev.account_id);
            prop_assert_eq!(orig.debit - orig.credit + rev.debit - rev.credit, Decimal::ZERO);
        }
    }

    /// Reversing twice restores the original sides.
    #[test]
    fn prop_double_reversal_restores_sides(original in arb_balanced_lines()) {
        let once = ReversalService::reversing_lines(&original);
        for (orig, rev) in original.iter().zip(&once) {
            let back = rev.swapped();
            prop_assert_eq!(back.debit, orig.debit);
            prop_assert_eq!(back.credit, orig.credit);
        }
    }
}
