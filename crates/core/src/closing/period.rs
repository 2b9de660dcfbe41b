//! Accounting period records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use neraca_shared::types::{AccountingPeriodId, JournalEntryId, UserId};

/// Scope of a closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodKind {
    /// An arbitrary closed range (usually a month).
    Period,
    /// A whole fiscal year.
    FiscalYear,
}

impl PeriodKind {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Period => "PERIOD",
            Self::FiscalYear => "FISCAL_YEAR",
        }
    }
}

impl std::str::FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PERIOD" => Ok(Self::Period),
            "FISCAL_YEAR" => Ok(Self::FiscalYear),
            _ => Err(format!("Unknown period kind: {s}")),
        }
    }
}

/// A closed (or reopened) accounting period.
///
/// Immutable while closed; reopening is the only sanctioned change and
/// only while `is_locked` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    /// Unique identifier.
    pub id: AccountingPeriodId,
    /// Scope of the closing.
    pub kind: PeriodKind,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period.
    pub end_date: NaiveDate,
    /// Revenue zeroed by the closing.
    pub total_revenue: Decimal,
    /// Expense zeroed by the closing.
    pub total_expense: Decimal,
    /// `total_revenue - total_expense`.
    pub net_income: Decimal,
    /// Closing journal entry; `None` when there was nothing to zero.
    pub closing_entry_id: Option<JournalEntryId>,
    /// Whether the period is currently closed.
    pub is_closed: bool,
    /// Locked periods can never be reopened.
    pub is_locked: bool,
    /// Closing user.
    pub closed_by: Option<UserId>,
    /// Closing timestamp.
    pub closed_at: Option<DateTime<Utc>>,
    /// Closing notes plus reopen history.
    pub notes: String,
}

impl AccountingPeriod {
    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if this period overlaps `[start, end]`.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        date_ranges_overlap(self.start_date, self.end_date, start, end)
    }
}

/// Checks if two date ranges overlap.
///
/// Two ranges [a_start, a_end] and [b_start, b_end] overlap if:
/// a_start <= b_end AND a_end >= b_start
#[must_use]
pub fn date_ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}
