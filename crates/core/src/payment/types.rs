//! Payment and allocation types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use neraca_shared::types::{
    CashBankId, ContactId, JournalEntryId, PaymentAllocationId, PaymentId, PurchaseId, SaleId,
    UserId,
};

use crate::documents::PaymentMethod;

/// Which side of the business the counterparty is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CounterpartyRole {
    /// Customer paying us; money comes in.
    Receivable,
    /// Us paying a vendor; money goes out.
    Payable,
}

impl CounterpartyRole {
    /// Sign applied to the register balance for a payment of this role.
    #[must_use]
    pub fn cash_direction(self) -> Decimal {
        match self {
            Self::Receivable => Decimal::ONE,
            Self::Payable => Decimal::NEGATIVE_ONE,
        }
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receivable => "RECEIVABLE",
            Self::Payable => "PAYABLE",
        }
    }
}

impl std::fmt::Display for CounterpartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Receivable => "receivable",
            Self::Payable => "payable",
        })
    }
}

impl std::str::FromStr for CounterpartyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RECEIVABLE" => Ok(Self::Receivable),
            "PAYABLE" => Ok(Self::Payable),
            _ => Err(format!("Unknown counterparty role: {s}")),
        }
    }
}

/// Payment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// Recorded, not yet applied.
    Pending,
    /// Allocated, journaled, and reflected in the register.
    Completed,
    /// Cancelled; every effect has been reversed.
    Failed,
}

impl PaymentStatus {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" | "REVERSED" => Ok(Self::Failed),
            _ => Err(format!("Unknown payment status: {s}")),
        }
    }
}

/// A payment received from a customer or made to a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier.
    pub id: PaymentId,
    /// Pre-generated payment code.
    pub code: String,
    /// Customer or vendor.
    pub contact_id: ContactId,
    /// Direction of the payment.
    pub role: CounterpartyRole,
    /// Payment date.
    pub payment_date: NaiveDate,
    /// Full payment amount.
    pub amount: Decimal,
    /// Settlement method.
    pub method: PaymentMethod,
    /// Register the money moves through.
    pub cash_bank_id: CashBankId,
    /// Lifecycle status.
    pub status: PaymentStatus,
    /// Journal entry recording this payment.
    pub journal_entry_id: Option<JournalEntryId>,
    /// Free-form notes; cancellation reasons are appended.
    pub notes: String,
    /// Acting user.
    pub created_by: Option<UserId>,
}

/// Input for recording a new payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Pre-generated payment code.
    pub code: String,
    /// Customer or vendor.
    pub contact_id: ContactId,
    /// Direction of the payment.
    pub role: CounterpartyRole,
    /// Payment date.
    pub payment_date: NaiveDate,
    /// Full payment amount.
    pub amount: Decimal,
    /// Settlement method.
    pub method: PaymentMethod,
    /// Register the money moves through.
    pub cash_bank_id: CashBankId,
    /// Free-form notes.
    pub notes: String,
    /// Acting user.
    pub created_by: Option<UserId>,
}

/// The document a payment portion is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "UPPERCASE")]
pub enum AllocationTarget {
    /// A sales invoice.
    Sale(SaleId),
    /// A purchase bill.
    Purchase(PurchaseId),
}

impl AllocationTarget {
    /// Returns the target document's UUID.
    #[must_use]
    pub fn id(self) -> Uuid {
        match self {
            Self::Sale(id) => id.into_inner(),
            Self::Purchase(id) => id.into_inner(),
        }
    }
}

impl std::fmt::Display for AllocationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sale(id) => write!(f, "sale {id}"),
            Self::Purchase(id) => write!(f, "purchase {id}"),
        }
    }
}

/// A requested allocation, processed in list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Target document.
    pub target: AllocationTarget,
    /// Amount the caller wants to apply.
    pub requested: Decimal,
}

/// A persisted allocation of part of a payment to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    /// Unique identifier.
    pub id: PaymentAllocationId,
    /// Owning payment.
    pub payment_id: PaymentId,
    /// Target document.
    pub target: AllocationTarget,
    /// Amount applied.
    pub amount: Decimal,
}

/// Result of a successful allocation.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    /// The completed payment.
    pub payment: Payment,
    /// Allocations in request order.
    pub allocations: Vec<PaymentAllocation>,
    /// Part of the payment not applied to any document.
    pub unallocated: Decimal,
    /// Register balance after the movement.
    pub cash_bank_balance: Decimal,
}
