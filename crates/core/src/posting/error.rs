//! Event poster errors.

use thiserror::Error;

use neraca_shared::AppError;
use neraca_shared::types::{CashBankId, PaymentId, PurchaseId, SaleId};

use super::accounts::AccountRole;
use crate::ledger::LedgerError;
use crate::payment::CounterpartyRole;
use crate::store::StoreError;

/// Result alias for event posters.
pub type PostingResult<T> = Result<T, PostingError>;

/// Errors raised while turning business documents into journal entries.
#[derive(Debug, Error)]
pub enum PostingError {
    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(SaleId),

    /// Purchase not found.
    #[error("Purchase not found: {0}")]
    PurchaseNotFound(PurchaseId),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Cash/bank register not found.
    #[error("Cash/bank account not found: {0}")]
    CashBankNotFound(CashBankId),

    /// No usable account for a role.
    #[error("No usable account configured or found for role {0}")]
    AccountRoleUnresolved(AccountRole),

    /// The payment belongs to the other side of the business.
    #[error("Payment {payment} is not a {expected} payment")]
    PaymentRoleMismatch {
        /// Payment ID.
        payment: PaymentId,
        /// Role the poster expected.
        expected: CounterpartyRole,
    },

    /// Ledger rejected the entry.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SaleNotFound(_) => "SALE_NOT_FOUND",
            Self::PurchaseNotFound(_) => "PURCHASE_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::CashBankNotFound(_) => "CASH_BANK_NOT_FOUND",
            Self::AccountRoleUnresolved(_) => "ACCOUNT_NOT_CONFIGURED",
            Self::PaymentRoleMismatch { .. } => "PAYMENT_ROLE_MISMATCH",
            Self::Ledger(err) => err.error_code(),
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::SaleNotFound(_)
            | Self::PurchaseNotFound(_)
            | Self::PaymentNotFound(_)
            | Self::CashBankNotFound(_) => 404,
            Self::AccountRoleUnresolved(_) => 422,
            Self::PaymentRoleMismatch { .. } => 400,
            Self::Ledger(err) => err.http_status_code(),
            Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(err) => err.is_retryable(),
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl From<PostingError> for AppError {
    fn from(err: PostingError) -> Self {
        match err {
            PostingError::Ledger(inner) => inner.into(),
            PostingError::SaleNotFound(_)
            | PostingError::PurchaseNotFound(_)
            | PostingError::PaymentNotFound(_)
            | PostingError::CashBankNotFound(_) => Self::NotFound(err.to_string()),
            PostingError::AccountRoleUnresolved(_) => Self::BusinessRule(err.to_string()),
            PostingError::PaymentRoleMismatch { .. } => Self::Validation(err.to_string()),
            PostingError::Store(StoreError::Conflict(_)) => Self::Conflict(err.to_string()),
            PostingError::Store(_) => Self::Database(err.to_string()),
        }
    }
}
