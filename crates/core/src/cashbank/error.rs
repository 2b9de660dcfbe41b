//! Cash/bank synchronizer errors.

use thiserror::Error;

use neraca_shared::AppError;
use neraca_shared::types::{AccountId, CashBankId, CashBankTransactionId};

use crate::ledger::LedgerError;
use crate::ledger::types::AccountType;
use crate::store::StoreError;

/// Result alias for synchronizer operations.
pub type CashBankResult<T> = Result<T, CashBankError>;

/// Errors raised while linking, syncing, or recording cash/bank movements.
#[derive(Debug, Error)]
pub enum CashBankError {
    /// Register not found.
    #[error("Cash/bank account not found: {0}")]
    NotFound(CashBankId),

    /// Target account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Registers may only link to ASSET accounts.
    #[error("Account {account} has type {actual}, cash/bank accounts must link to an ASSET account")]
    AccountNotAsset {
        /// Target account.
        account: AccountId,
        /// Its actual type.
        actual: AccountType,
    },

    /// Header accounts cannot carry a register balance.
    #[error("Account {0} is a header account and cannot be linked")]
    HeaderAccount(AccountId),

    /// The account already backs another register.
    #[error("Account {account} is already linked to cash/bank {linked_to}")]
    AccountAlreadyLinked {
        /// Target account.
        account: AccountId,
        /// Register holding the link.
        linked_to: CashBankId,
    },

    /// Unlink called on a register without a link.
    #[error("Cash/bank account {0} is not linked to a COA account")]
    NotLinked(CashBankId),

    /// Subsidiary transaction not found.
    #[error("Cash/bank transaction not found: {0}")]
    TransactionNotFound(CashBankTransactionId),

    /// Subsidiary transaction already soft-deleted.
    #[error("Cash/bank transaction {0} is already deleted")]
    TransactionDeleted(CashBankTransactionId),

    /// Zero-amount movements are meaningless.
    #[error("Cash/bank transaction amount cannot be zero")]
    ZeroAmount,

    /// Balance propagation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CashBankError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "CASH_BANK_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountNotAsset { .. } => "ACCOUNT_NOT_ASSET",
            Self::HeaderAccount(_) => "HEADER_ACCOUNT",
            Self::AccountAlreadyLinked { .. } => "ACCOUNT_ALREADY_LINKED",
            Self::NotLinked(_) => "CASH_BANK_NOT_LINKED",
            Self::TransactionNotFound(_) => "CASH_BANK_TRANSACTION_NOT_FOUND",
            Self::TransactionDeleted(_) => "CASH_BANK_TRANSACTION_DELETED",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::Ledger(err) => err.error_code(),
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::AccountNotFound(_) | Self::TransactionNotFound(_) => 404,
            Self::AccountNotAsset { .. } | Self::HeaderAccount(_) | Self::ZeroAmount => 400,
            Self::AccountAlreadyLinked { .. } | Self::TransactionDeleted(_) => 409,
            Self::NotLinked(_) => 422,
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

impl From<CashBankError> for AppError {
    fn from(err: CashBankError) -> Self {
        let message = err.to_string();
        match err {
            CashBankError::Ledger(inner) => inner.into(),
            CashBankError::NotFound(_)
            | CashBankError::AccountNotFound(_)
            | CashBankError::TransactionNotFound(_) => Self::NotFound(message),
            CashBankError::AccountNotAsset { .. }
            | CashBankError::HeaderAccount(_)
            | CashBankError::ZeroAmount => Self::Validation(message),
            CashBankError::AccountAlreadyLinked { .. } | CashBankError::TransactionDeleted(_) => {
                Self::Conflict(message)
            }
            CashBankError::NotLinked(_) => Self::BusinessRule(message),
            CashBankError::Store(StoreError::Conflict(_)) => Self::Conflict(message),
            CashBankError::Store(_) => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_asset_message() {
        let account = AccountId::new();
        let err = CashBankError::AccountNotAsset {
            account,
            actual: AccountType::Revenue,
        };
        assert!(err.to_string().contains("REVENUE"));
        assert_eq!(err.http_status_code(), 400);
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }

    #[test]
    fn test_ledger_errors_keep_their_code() {
        let err = CashBankError::from(LedgerError::HierarchyCycle(AccountId::new()));
        assert_eq!(err.error_code(), "HIERARCHY_CYCLE");
        assert!(!err.is_retryable());
    }
}
