//! Cash/bank subsidiary ledger types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use neraca_shared::types::{AccountId, CashBankId, CashBankTransactionId};

/// A cash drawer or bank account tracked as a subsidiary ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBank {
    /// Unique identifier.
    pub id: CashBankId,
    /// Register code (e.g. "KAS-01").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Linked ASSET account in the chart of accounts.
    pub account_id: Option<AccountId>,
    /// Subsidiary balance.
    pub balance: Decimal,
    /// Inactive registers are ignored by sweeps.
    pub is_active: bool,
}

/// What produced a subsidiary transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashBankReference {
    /// A completed payment.
    Payment,
    /// Compensation for a cancelled payment.
    PaymentReversal,
    /// Transfer between registers.
    Transfer,
    /// Manual deposit.
    Deposit,
    /// Manual withdrawal.
    Withdrawal,
    /// Opening balance.
    Opening,
}

impl CashBankReference {
    /// Returns the canonical reference type string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "PAYMENT",
            Self::PaymentReversal => "PAYMENT_REVERSAL",
            Self::Transfer => "TRANSFER",
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Opening => "OPENING",
        }
    }
}

impl std::str::FromStr for CashBankReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PAYMENT" => Ok(Self::Payment),
            "PAYMENT_REVERSAL" => Ok(Self::PaymentReversal),
            "TRANSFER" => Ok(Self::Transfer),
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            "OPENING" => Ok(Self::Opening),
            _ => Err(format!("Unknown cash/bank reference type: {s}")),
        }
    }
}

/// Append-only subsidiary ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBankTransaction {
    /// Unique identifier.
    pub id: CashBankTransactionId,
    /// Owning register.
    pub cash_bank_id: CashBankId,
    /// Signed amount: positive in, negative out.
    pub amount: Decimal,
    /// Register balance after this row.
    pub balance_after: Decimal,
    /// What produced this row.
    pub reference_type: CashBankReference,
    /// ID of the producing object.
    pub reference_id: Option<Uuid>,
    /// Transaction date.
    pub transaction_date: NaiveDate,
    /// Free-form notes.
    pub notes: String,
    /// Soft-delete marker; deleted rows are excluded from sums.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for appending a subsidiary transaction.
#[derive(Debug, Clone)]
pub struct NewCashBankTransaction {
    /// Owning register.
    pub cash_bank_id: CashBankId,
    /// Signed amount.
    pub amount: Decimal,
    /// What produced this row.
    pub reference_type: CashBankReference,
    /// ID of the producing object.
    pub reference_id: Option<Uuid>,
    /// Transaction date.
    pub transaction_date: NaiveDate,
    /// Free-form notes.
    pub notes: String,
}

/// Drift classification between a register, its account, and its transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyKind {
    /// Register has no linked account; needs a human to pick one.
    NotLinked,
    /// Register balance differs from the linked account balance.
    BalanceMismatch,
    /// Transaction sum differs from the register balance.
    TransactionSumMismatch,
    /// Everything agrees.
    SyncOk,
}

impl DiscrepancyKind {
    /// Returns true if `AutoFix` can repair this finding.
    #[must_use]
    pub const fn is_auto_fixable(self) -> bool {
        matches!(self, Self::BalanceMismatch | Self::TransactionSumMismatch)
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotLinked => "NOT_LINKED",
            Self::BalanceMismatch => "BALANCE_MISMATCH",
            Self::TransactionSumMismatch => "TRANSACTION_SUM_MISMATCH",
            Self::SyncOk => "SYNC_OK",
        }
    }

    /// Classifies a register given its linked account balance and transaction sum.
    ///
    /// Differences within `epsilon` are treated as equal.
    #[must_use]
    pub fn classify(
        cash_bank_balance: Decimal,
        account_balance: Option<Decimal>,
        transaction_sum: Decimal,
        epsilon: Decimal,
    ) -> Self {
        let Some(account_balance) = account_balance else {
            return Self::NotLinked;
        };
        if (cash_bank_balance - account_balance).abs() > epsilon {
            Self::BalanceMismatch
        } else if (transaction_sum - cash_bank_balance).abs() > epsilon {
            Self::TransactionSumMismatch
        } else {
            Self::SyncOk
        }
    }
}

/// One row of the discrepancy report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// Register.
    pub cash_bank_id: CashBankId,
    /// Register code.
    pub cash_bank_code: String,
    /// Register balance.
    pub cash_bank_balance: Decimal,
    /// Linked account, if any.
    pub account_id: Option<AccountId>,
    /// Linked account code, if any.
    pub account_code: Option<String>,
    /// Linked account balance, if any.
    pub account_balance: Option<Decimal>,
    /// Sum of non-deleted transactions.
    pub transaction_sum: Decimal,
    /// Classification.
    pub kind: DiscrepancyKind,
}
