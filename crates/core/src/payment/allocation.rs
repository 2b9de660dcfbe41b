//! Pure allocation planning.
//!
//! Requests are walked in order against a running `remaining` counter. Each
//! applied amount is clamped to `min(requested, remaining, outstanding)`, so
//! the plan never exceeds the payment and never drives a target below zero.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::types::{AllocationRequest, AllocationTarget};

/// One amount the plan applies to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedAllocation {
    /// Target document.
    pub target: AllocationTarget,
    /// What the caller asked for.
    pub requested: Decimal,
    /// What is actually applied.
    pub applied: Decimal,
}

/// Result of planning a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Non-zero allocations in request order.
    pub allocations: Vec<PlannedAllocation>,
    /// Part of the payment left over.
    pub unallocated: Decimal,
}

impl AllocationPlan {
    /// Sum of applied amounts.
    #[must_use]
    pub fn allocated(&self) -> Decimal {
        self.allocations.iter().map(|a| a.applied).sum()
    }
}

/// Plans how `amount` is spread over `requests`.
///
/// `outstanding` holds each target's outstanding amount before the payment.
/// A target listed twice sees what the first request left. Targets missing
/// from the map are treated as fully paid.
#[must_use]
pub fn plan_allocations(
    amount: Decimal,
    requests: &[AllocationRequest],
    outstanding: &HashMap<AllocationTarget, Decimal>,
) -> AllocationPlan {
    let mut remaining = amount;
    let mut open = outstanding.clone();
    let mut allocations = Vec::new();

    for request in requests {
        if remaining <= Decimal::ZERO {
            break;
        }
        let left = open.get(&request.target).copied().unwrap_or_default();
        let applied = request.requested.min(remaining).min(left);
        if applied <= Decimal::ZERO {
            continue;
        }
        remaining -= applied;
        open.insert(request.target, left - applied);
        allocations.push(PlannedAllocation {
            target: request.target,
            requested: request.requested,
            applied,
        });
    }

    AllocationPlan {
        allocations,
        unallocated: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neraca_shared::types::SaleId;
    use rust_decimal_macros::dec;

    fn sale() -> AllocationTarget {
        AllocationTarget::Sale(SaleId::new())
    }

    fn request(target: AllocationTarget, requested: Decimal) -> AllocationRequest {
        AllocationRequest { target, requested }
    }

    #[test]
    fn test_clamps_to_outstanding_and_remaining() {
        let (a, b, c) = (sale(), sale(), sale());
        let outstanding = HashMap::from([(a, dec!(300)), (b, dec!(500)), (c, dec!(1000))]);
        let plan = plan_allocations(
            dec!(1000),
            &[request(a, dec!(400)), request(b, dec!(500)), request(c, dec!(500))],
            &outstanding,
        );

        let applied: Vec<_> = plan.allocations.iter().map(|p| p.applied).collect();
        assert_eq!(applied, vec![dec!(300), dec!(500), dec!(200)]);
        assert_eq!(plan.unallocated, Decimal::ZERO);
    }

    #[test]
    fn test_leftover_is_unallocated() {
        let a = sale();
        let plan = plan_allocations(
            dec!(1000),
            &[request(a, dec!(250))],
            &HashMap::from([(a, dec!(1000))]),
        );
        assert_eq!(plan.allocated(), dec!(250));
        assert_eq!(plan.unallocated, dec!(750));
    }

    #[test]
    fn test_repeated_target_sees_previous_application() {
        let a = sale();
        let plan = plan_allocations(
            dec!(1000),
            &[request(a, dec!(600)), request(a, dec!(600))],
            &HashMap::from([(a, dec!(800))]),
        );
        let applied: Vec<_> = plan.allocations.iter().map(|p| p.applied).collect();
        assert_eq!(applied, vec![dec!(600), dec!(200)]);
        assert_eq!(plan.unallocated, dec!(200));
    }

    #[test]
    fn test_exhausted_payment_skips_rest() {
        let (a, b) = (sale(), sale());
        let plan = plan_allocations(
            dec!(100),
            &[request(a, dec!(100)), request(b, dec!(50))],
            &HashMap::from([(a, dec!(100)), (b, dec!(50))]),
        );
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].target, a);
    }
}
