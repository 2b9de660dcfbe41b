//! Property-based tests for the posting pipeline.
//!
//! Random balanced entries are posted against the seeded chart; afterwards
//! every header equals the sum of its children and the trial balance nets
//! to zero.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::service::Ledger;
use super::types::{LineInput, PostingRequest};
use crate::testing::{date, posting_service, shared, standard_chart};

const LEAVES: &[&str] = &[
    "1101", "1102", "1201", "1240", "1301", "2101", "2103", "3201", "4101", "5101", "5201",
];

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// One entry: a debit leaf, a credit leaf, and an amount.
fn arb_posting() -> impl Strategy<Value = (usize, usize, Decimal)> {
    (0..LEAVES.len(), 0..LEAVES.len(), positive_amount())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Headers always equal the sum of their children after postings.
    #[test]
    fn prop_headers_equal_sum_of_children(
        postings in prop::collection::vec(arb_posting(), 1..8),
    ) {
        let state = runtime().block_on(async {
            let (store, chart) = standard_chart().await;
            let ledger = Ledger::new(shared(&store), posting_service());
            for (i, (debit, credit, amount)) in postings.iter().enumerate() {
                ledger
                    .post(PostingRequest {
                        code: format!("JV-{i}"),
                        entry_date: date(2026, 2, 1),
                        description: String::new(),
                        source: None,
                        lines: vec![
                            LineInput::debit(chart.id(LEAVES[*debit]), *amount, ""),
                            LineInput::credit(chart.id(LEAVES[*credit]), *amount, ""),
                        ],
                        created_by: None,
                    })
                    .await
                    .unwrap();
            }
            store.snapshot().await
        });

        for account in state.accounts.values().filter(|a| a.is_header) {
            let children: Decimal = state
                .accounts
                .values()
                .filter(|child| child.parent_id == Some(account.id))
                .map(|child| child.balance)
                .sum();
            prop_assert_eq!(account.balance, children, "header {}", account.code);
        }

        let trial_balance: Decimal = state
            .accounts
            .values()
            .filter(|a| !a.is_header)
            .map(|a| if a.account_type.is_debit_normal() { a.balance } else { -a.balance })
            .sum();
        prop_assert_eq!(trial_balance, Decimal::ZERO);
    }
}
