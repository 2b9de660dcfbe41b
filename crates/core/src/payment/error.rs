//! Payment allocator errors.

use rust_decimal::Decimal;
use thiserror::Error;

use neraca_shared::AppError;
use neraca_shared::types::{CashBankId, PaymentId};

use super::types::{AllocationTarget, CounterpartyRole};
use crate::cashbank::CashBankError;
use crate::ledger::LedgerError;
use crate::posting::PostingError;
use crate::store::StoreError;

/// Result alias for the allocator.
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Errors raised while allocating or cancelling payments.
#[derive(Debug, Error)]
pub enum PaymentError {
    // ========== Validation Errors ==========
    /// Payment amount must be positive.
    #[error("Payment amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Requested allocation amount must be positive.
    #[error("Allocation to {target} must be positive, got {requested}")]
    InvalidAllocation {
        /// Target document.
        target: AllocationTarget,
        /// Requested amount.
        requested: Decimal,
    },

    /// A receipt targeted a bill or a vendor payment targeted an invoice.
    #[error("A {role} payment cannot be allocated to {target}")]
    TargetRoleMismatch {
        /// Target document.
        target: AllocationTarget,
        /// Payment role.
        role: CounterpartyRole,
    },

    /// The target belongs to another customer or vendor.
    #[error("{0} belongs to a different contact than the payment")]
    ContactMismatch(AllocationTarget),

    // ========== Business Rule Errors ==========
    /// Target document not found.
    #[error("Allocation target not found: {0}")]
    TargetNotFound(AllocationTarget),

    /// Target status does not accept payments.
    #[error("{target} has status {status} and cannot receive payments")]
    TargetNotEligible {
        /// Target document.
        target: AllocationTarget,
        /// Its current status.
        status: &'static str,
    },

    /// Target has nothing outstanding.
    #[error("{0} is already fully paid")]
    TargetSettled(AllocationTarget),

    /// Register does not hold enough money for an outgoing movement.
    #[error("Insufficient balance in cash/bank {cash_bank}: available {available}, required {required}")]
    InsufficientBalance {
        /// Register.
        cash_bank: CashBankId,
        /// Current balance.
        available: Decimal,
        /// Amount required.
        required: Decimal,
    },

    /// Payment not found.
    #[error("Payment not found: {0}")]
    NotFound(PaymentId),

    /// Payment is already cancelled.
    #[error("Payment {0} is already cancelled")]
    AlreadyCancelled(PaymentId),

    /// Cancellation requires an acting user.
    #[error("Cancelling a payment requires an acting user")]
    MissingUser,

    // ========== Collaborator Errors ==========
    /// Payment journal failed.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// Register movement failed.
    #[error(transparent)]
    CashBank(#[from] CashBankError),

    /// Reversal failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PaymentError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidAllocation { .. } => "INVALID_ALLOCATION",
            Self::TargetRoleMismatch { .. } => "TARGET_ROLE_MISMATCH",
            Self::ContactMismatch(_) => "CONTACT_MISMATCH",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::TargetNotEligible { .. } => "TARGET_NOT_ELIGIBLE",
            Self::TargetSettled(_) => "TARGET_SETTLED",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::NotFound(_) => "PAYMENT_NOT_FOUND",
            Self::AlreadyCancelled(_) => "PAYMENT_ALREADY_CANCELLED",
            Self::MissingUser => "MISSING_USER",
            Self::Posting(err) => err.error_code(),
            Self::CashBank(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidAllocation { .. }
            | Self::TargetRoleMismatch { .. }
            | Self::ContactMismatch(_) => 400,
            Self::MissingUser => 401,
            Self::TargetNotFound(_) | Self::NotFound(_) => 404,
            Self::AlreadyCancelled(_) => 409,
            Self::TargetNotEligible { .. }
            | Self::TargetSettled(_)
            | Self::InsufficientBalance { .. } => 422,
            Self::Posting(err) => err.http_status_code(),
            Self::CashBank(err) => err.http_status_code(),
            Self::Ledger(err) => err.http_status_code(),
            Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Posting(err) => err.is_retryable(),
            Self::CashBank(err) => err.is_retryable(),
            Self::Ledger(err) => err.is_retryable(),
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        let message = err.to_string();
        match err {
            PaymentError::Posting(inner) => inner.into(),
            PaymentError::CashBank(inner) => inner.into(),
            PaymentError::Ledger(inner) => inner.into(),
            PaymentError::InvalidAmount(_)
            | PaymentError::InvalidAllocation { .. }
            | PaymentError::TargetRoleMismatch { .. }
            | PaymentError::ContactMismatch(_) => Self::Validation(message),
            PaymentError::TargetNotFound(_) | PaymentError::NotFound(_) => Self::NotFound(message),
            PaymentError::TargetNotEligible { .. }
            | PaymentError::TargetSettled(_)
            | PaymentError::InsufficientBalance { .. }
            | PaymentError::AlreadyCancelled(_) => Self::BusinessRule(message),
            PaymentError::MissingUser => Self::MissingUser(message),
            PaymentError::Store(StoreError::Conflict(_) | StoreError::UniqueViolation(_)) => {
                Self::Conflict(message)
            }
            PaymentError::Store(_) => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neraca_shared::types::SaleId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_balance_is_business_rule() {
        let err = PaymentError::InsufficientBalance {
            cash_bank: CashBankId::new(),
            available: dec!(100),
            required: dec!(250),
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        assert_eq!(AppError::from(err).status_code(), 422);
    }

    #[test]
    fn test_not_eligible_message_names_status() {
        let err = PaymentError::TargetNotEligible {
            target: AllocationTarget::Sale(SaleId::new()),
            status: "DRAFT",
        };
        assert!(err.to_string().contains("status DRAFT"));
    }

    #[test]
    fn test_missing_user_maps_to_missing_user() {
        assert!(matches!(
            AppError::from(PaymentError::MissingUser),
            AppError::MissingUser(_)
        ));
    }
}
