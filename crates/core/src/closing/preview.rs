//! Closing preview types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use neraca_shared::types::AccountId;

use super::period::PeriodKind;
use crate::ledger::types::{Account, AccountType};

/// A temporary account that a closing will zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosingAccount {
    /// Account ID.
    pub id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Balance in normal-balance polarity.
    pub balance: Decimal,
}

impl From<&Account> for ClosingAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            code: account.code.clone(),
            name: account.name.clone(),
            balance: account.balance,
        }
    }
}

/// A condition that prevents closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosingBlocker {
    /// End date before start date.
    InvalidRange,
    /// No account carries the retained earnings code.
    RetainedEarningsMissing {
        /// Configured code.
        code: String,
    },
    /// The retained earnings account is not an equity account.
    RetainedEarningsNotEquity {
        /// Configured code.
        code: String,
        /// Its actual type.
        actual: AccountType,
    },
    /// The retained earnings account is inactive or a header.
    RetainedEarningsNotPostable {
        /// Configured code.
        code: String,
    },
    /// The range overlaps closed periods.
    OverlapsClosedPeriod {
        /// Number of overlapping closed periods.
        count: usize,
    },
    /// Entries in the range are unbalanced.
    UnbalancedEntries {
        /// Number of unbalanced entries.
        count: usize,
    },
    /// Entries in the range are still drafts.
    DraftEntries {
        /// Number of draft entries.
        count: usize,
    },
}

impl std::fmt::Display for ClosingBlocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange => f.write_str("end date must not be before start date"),
            Self::RetainedEarningsMissing { code } => {
                write!(f, "retained earnings account ({code}) not found")
            }
            Self::RetainedEarningsNotEquity { code, actual } => write!(
                f,
                "retained earnings account ({code}) must be an EQUITY account, found {actual}"
            ),
            Self::RetainedEarningsNotPostable { code } => {
                write!(f, "retained earnings account ({code}) is inactive or a header")
            }
            Self::OverlapsClosedPeriod { count } => {
                write!(f, "overlaps {count} closed period(s)")
            }
            Self::UnbalancedEntries { count } => {
                write!(f, "{count} unbalanced journal entries in the period")
            }
            Self::DraftEntries { count } => write!(f, "{count} draft journal entries in the period"),
        }
    }
}

/// Something worth knowing that does not prevent closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosingWarning {
    /// The range does not start the day after the last closed period.
    Discontinuous {
        /// Day after the last closed period.
        expected_start: NaiveDate,
    },
    /// No posted entries fall inside the range.
    NoTransactions,
    /// Temporary balances exist although nothing was posted in the range.
    BalancesFromOutsidePeriod,
}

/// Side-effect-free result of checking a closing.
#[derive(Debug, Clone, Serialize)]
pub struct ClosingPreview {
    /// Scope.
    pub kind: PeriodKind,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
    /// Retained earnings account, if usable.
    pub retained_earnings: Option<ClosingAccount>,
    /// Non-zero revenue accounts.
    pub revenue_accounts: Vec<ClosingAccount>,
    /// Non-zero expense accounts.
    pub expense_accounts: Vec<ClosingAccount>,
    /// Sum of revenue balances.
    pub total_revenue: Decimal,
    /// Sum of expense balances.
    pub total_expense: Decimal,
    /// `total_revenue - total_expense`.
    pub net_income: Decimal,
    /// Posted entries dated inside the range.
    pub transaction_count: usize,
    /// End of the last closed period, if any.
    pub last_closing_date: Option<NaiveDate>,
    /// Reasons the closing cannot proceed.
    pub blockers: Vec<ClosingBlocker>,
    /// Non-blocking observations.
    pub warnings: Vec<ClosingWarning>,
}

impl ClosingPreview {
    pub(crate) fn empty(kind: PeriodKind, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            kind,
            start_date,
            end_date,
            retained_earnings: None,
            revenue_accounts: Vec::new(),
            expense_accounts: Vec::new(),
            total_revenue: Decimal::ZERO,
            total_expense: Decimal::ZERO,
            net_income: Decimal::ZERO,
            transaction_count: 0,
            last_closing_date: None,
            blockers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// True when nothing blocks the closing.
    #[must_use]
    pub fn can_close(&self) -> bool {
        self.blockers.is_empty()
    }

    /// True when the closing has temporary balances to zero.
    #[must_use]
    pub fn has_balances(&self) -> bool {
        !self.revenue_accounts.is_empty() || !self.expense_accounts.is_empty()
    }
}

/// Where the last closing ended and the next one should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LastClosingInfo {
    /// End of the most recent closed period.
    pub last_closing_date: NaiveDate,
    /// Day after it.
    pub next_start_date: NaiveDate,
}
