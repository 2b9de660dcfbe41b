//! Ledger error types for posting and guard failures.
//!
//! Validation errors are raised before any write. Storage errors abort the
//! enclosing unit of work, which rolls back everything written so far.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use neraca_shared::AppError;
use neraca_shared::types::{AccountId, JournalEntryId};

use super::types::SourceType;
use crate::store::StoreError;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    /// Entry is not balanced (debits != credits).
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Line amount cannot be negative.
    #[error("Line {line} has a negative amount")]
    NegativeAmount {
        /// 1-based line number.
        line: usize,
    },

    /// Line must carry exactly one of debit or credit.
    #[error("Line {line} must specify either debit or credit, not both or neither")]
    InvalidLine {
        /// 1-based line number.
        line: usize,
    },

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Header accounts aggregate children and cannot be posted to.
    #[error("Account {0} is a header account and does not allow direct posting")]
    HeaderAccount(AccountId),

    /// The parent chain of an account loops back on itself.
    #[error("Account hierarchy contains a cycle at {0}")]
    HierarchyCycle(AccountId),

    // ========== Entry State Errors ==========
    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Only POSTED entries can be reversed.
    #[error("Journal entry {0} is not posted and cannot be reversed")]
    NotPosted(JournalEntryId),

    /// A posted entry already exists for this source.
    #[error("A posted journal entry already exists for {source_type} {source_id}")]
    DuplicatePosting {
        /// Source type.
        source_type: SourceType,
        /// Source ID.
        source_id: Uuid,
    },

    // ========== Storage Errors ==========
    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::HeaderAccount(_) => "HEADER_ACCOUNT",
            Self::HierarchyCycle(_) => "HIERARCHY_CYCLE",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::NotPosted(_) => "ENTRY_NOT_POSTED",
            Self::DuplicatePosting { .. } => "DUPLICATE_POSTING",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InsufficientLines
            | Self::UnbalancedEntry { .. }
            | Self::NegativeAmount { .. }
            | Self::InvalidLine { .. }
            | Self::AccountInactive(_)
            | Self::HeaderAccount(_)
            | Self::NotPosted(_) => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::EntryNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicatePosting { .. } => 409,

            // 500 Internal Server Error
            Self::HierarchyCycle(_) | Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_retryable())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::AccountNotFound(_) | LedgerError::EntryNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::DuplicatePosting { .. } => Self::Conflict(message),
            LedgerError::Store(StoreError::Conflict(_) | StoreError::UniqueViolation(_)) => {
                Self::Conflict(message)
            }
            LedgerError::Store(_) => Self::Database(message),
            LedgerError::HierarchyCycle(_) => Self::Internal(message),
            LedgerError::NotPosted(_) => Self::BusinessRule(message),
            _ => Self::Validation(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InsufficientLines.error_code(), "INSUFFICIENT_LINES");
        assert_eq!(
            LedgerError::UnbalancedEntry {
                debit: dec!(1.00),
                credit: dec!(0.50),
            }
            .error_code(),
            "UNBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::HeaderAccount(AccountId::new()).error_code(),
            "HEADER_ACCOUNT"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::InsufficientLines.http_status_code(), 400);
        assert_eq!(
            LedgerError::AccountNotFound(AccountId::new()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::DuplicatePosting {
                source_type: SourceType::Sales,
                source_id: Uuid::nil(),
            }
            .http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::Store(StoreError::Backend("boom".into())).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::Store(StoreError::Conflict("lock".into())).is_retryable());
        assert!(!LedgerError::Store(StoreError::Backend("down".into())).is_retryable());
        assert!(!LedgerError::InsufficientLines.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::UnbalancedEntry {
            debit: dec!(100.00),
            credit: dec!(50.00),
        };
        assert_eq!(
            err.to_string(),
            "Journal entry is not balanced. Debit: 100.00, Credit: 50.00"
        );
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = LedgerError::InsufficientLines.into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");

        let app: AppError = LedgerError::EntryNotFound(JournalEntryId::new()).into();
        assert_eq!(app.status_code(), 404);

        let app: AppError = LedgerError::Store(StoreError::Conflict("x".into())).into();
        assert_eq!(app.error_code(), "CONFLICT");
    }
}
