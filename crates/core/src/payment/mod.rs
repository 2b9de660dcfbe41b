//! Payment allocation across invoices and bills.

pub mod allocation;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod allocation_props;

pub use allocation::{AllocationPlan, PlannedAllocation, plan_allocations};
pub use error::{PaymentError, PaymentResult};
pub use service::PaymentAllocator;
pub use types::{
    AllocationRequest, AllocationTarget, CounterpartyRole, NewPayment, Payment, PaymentAllocation,
    PaymentOutcome, PaymentStatus,
};
