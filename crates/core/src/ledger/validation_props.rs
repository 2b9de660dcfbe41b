//! Property-based tests for journal line validation.

use neraca_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::LedgerError;
use super::types::LineInput;
use super::validation::validate_lines;

const EPS: Decimal = dec!(0.01);

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Builds a balanced set: one debit per amount, one credit for the total.
fn balanced_lines(amounts: &[Decimal]) -> Vec<LineInput> {
    let total: Decimal = amounts.iter().copied().sum();
    let mut lines: Vec<LineInput> = amounts
        .iter()
        .map(|amount| LineInput::debit(AccountId::new(), *amount, "debit"))
        .collect();
    lines.push(LineInput::credit(AccountId::new(), total, "credit"));
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any set of debits offset by one credit for their sum is accepted.
    #[test]
    fn prop_balanced_lines_accepted(
        amounts in prop::collection::vec(positive_amount(), 1..10),
    ) {
        let lines = balanced_lines(&amounts);
        let totals = validate_lines(&lines, EPS).unwrap();
        prop_assert_eq!(totals.debit, totals.credit);
    }

    /// Skewing a balanced set by more than the tolerance is rejected.
    #[test]
    fn prop_skewed_lines_rejected(
        amounts in prop::collection::vec(positive_amount(), 1..10),
        skew in 2i64..1_000_000i64,
    ) {
        let mut lines = balanced_lines(&amounts);
        let last = lines.len() - 1;
        lines[last].credit += Decimal::new(skew, 2);
        let is_unbalanced = matches!(
            validate_lines(&lines, EPS),
            Err(LedgerError::UnbalancedEntry { .. })
        );
        prop_assert!(is_unbalanced);
    }

    /// Swapping every line keeps a balanced set balanced.
    #[test]
    fn prop_swapped_lines_stay_balanced(
        amounts in prop::collection::vec(positive_amount(), 1..10),
    ) {
        let lines: Vec<LineInput> = balanced_lines(&amounts).iter().map(LineInput::swapped).collect();
        prop_assert!(validate_lines(&lines, EPS).is_ok());
    }

    /// A line with both sides set is rejected regardless of balance.
    #[test]
    fn prop_two_sided_line_rejected(amount in positive_amount()) {
        let mut first = LineInput::debit(AccountId::new(), amount, "");
        first.credit = amount;
        let lines = vec![first, LineInput::credit(AccountId::new(), amount, "")];
        let is_invalid = matches!(
            validate_lines(&lines, EPS),
            Err(LedgerError::InvalidLine { line: 1 })
        );
        prop_assert!(is_invalid);
    }
}
