//! Period closer errors.

use chrono::NaiveDate;
use thiserror::Error;

use neraca_shared::AppError;

use super::preview::ClosingBlocker;
use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Result alias for closing operations.
pub type ClosingResult<T> = Result<T, ClosingError>;

/// Errors raised while closing, reopening, or locking periods.
#[derive(Debug, Error)]
pub enum ClosingError {
    /// End date before start date.
    #[error("Invalid period: end date {end} is before start date {start}")]
    InvalidRange {
        /// First day.
        start: NaiveDate,
        /// Last day.
        end: NaiveDate,
    },

    /// The preview found blockers.
    #[error("Period cannot be closed: {}", join(.0))]
    CannotClose(Vec<ClosingBlocker>),

    /// No closed period with exactly these dates.
    #[error("No closed period found for {start} to {end}")]
    PeriodNotFound {
        /// First day.
        start: NaiveDate,
        /// Last day.
        end: NaiveDate,
    },

    /// Locked periods can never be reopened.
    #[error("Period {start} to {end} is locked and cannot be reopened")]
    PeriodLocked {
        /// First day.
        start: NaiveDate,
        /// Last day.
        end: NaiveDate,
    },

    /// A later period is still closed.
    #[error("Cannot reopen: a later period starting {later_start} is closed, reopen it first")]
    LaterPeriodClosed {
        /// Start of the later closed period.
        later_start: NaiveDate,
    },

    /// Closing and reopening require an acting user.
    #[error("Closing operations require an acting user")]
    MissingUser,

    /// Posting the closing or its reversal failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn join(blockers: &[ClosingBlocker]) -> String {
    blockers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClosingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRange { .. } => "INVALID_PERIOD",
            Self::CannotClose(_) => "CANNOT_CLOSE_PERIOD",
            Self::PeriodNotFound { .. } => "PERIOD_NOT_FOUND",
            Self::PeriodLocked { .. } => "PERIOD_LOCKED",
            Self::LaterPeriodClosed { .. } => "LATER_PERIOD_CLOSED",
            Self::MissingUser => "MISSING_USER",
            Self::Ledger(err) => err.error_code(),
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidRange { .. } => 400,
            Self::MissingUser => 401,
            Self::PeriodNotFound { .. } => 404,
            Self::CannotClose(_) | Self::PeriodLocked { .. } | Self::LaterPeriodClosed { .. } => {
                422
            }
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

impl From<ClosingError> for AppError {
    fn from(err: ClosingError) -> Self {
        let message = err.to_string();
        match err {
            ClosingError::Ledger(inner) => inner.into(),
            ClosingError::InvalidRange { .. } => Self::Validation(message),
            ClosingError::PeriodNotFound { .. } => Self::NotFound(message),
            ClosingError::CannotClose(_)
            | ClosingError::PeriodLocked { .. }
            | ClosingError::LaterPeriodClosed { .. } => Self::BusinessRule(message),
            ClosingError::MissingUser => Self::MissingUser(message),
            ClosingError::Store(StoreError::Conflict(_) | StoreError::UniqueViolation(_)) => {
                Self::Conflict(message)
            }
            ClosingError::Store(_) => Self::Database(message),
        }
    }
}
