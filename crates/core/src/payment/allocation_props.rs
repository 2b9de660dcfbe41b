//! Property tests for allocation planning.

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;

use neraca_shared::types::SaleId;

use super::allocation::plan_allocations;
use super::types::{AllocationRequest, AllocationTarget};

fn cents(max: i64) -> impl Strategy<Value = Decimal> {
    (0..=max).prop_map(|c| Decimal::new(c, 2))
}

/// (requested, outstanding) pairs over distinct targets.
fn requests() -> impl Strategy<Value = Vec<(Decimal, Decimal)>> {
    prop::collection::vec((cents(50_000_000), cents(50_000_000)), 0..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_never_exceeds_payment_or_outstanding(
        amount in cents(100_000_000),
        pairs in requests(),
    ) {
        let mut outstanding = HashMap::new();
        let mut reqs = Vec::new();
        for (requested, open) in &pairs {
            let target = AllocationTarget::Sale(SaleId::new());
            outstanding.insert(target, *open);
            reqs.push(AllocationRequest { target, requested: *requested });
        }

        let plan = plan_allocations(amount, &reqs, &outstanding);

        prop_assert!(plan.allocated() <= amount);
        prop_assert_eq!(plan.allocated() + plan.unallocated, amount);
        for allocation in &plan.allocations {
            prop_assert!(allocation.applied > Decimal::ZERO);
            prop_assert!(allocation.applied <= allocation.requested);
            prop_assert!(allocation.applied <= outstanding[&allocation.target]);
        }
    }

    #[test]
    fn prop_repeated_target_never_overdrawn(
        amount in cents(100_000_000),
        open in cents(50_000_000),
        asks in prop::collection::vec(cents(50_000_000), 1..6),
    ) {
        let target = AllocationTarget::Sale(SaleId::new());
        let reqs: Vec<_> = asks
            .iter()
            .map(|requested| AllocationRequest { target, requested: *requested })
            .collect();

        let plan = plan_allocations(amount, &reqs, &HashMap::from([(target, open)]));

        prop_assert!(plan.allocated() <= open);
        prop_assert!(plan.allocated() <= amount);
    }
}
