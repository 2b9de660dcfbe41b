//! Business rule validation for proposed journal lines.
//!
//! Everything here runs before the first write of a posting, so a rejected
//! entry never leaves partial state behind.

use rust_decimal::Decimal;

use super::error::{LedgerError, LedgerResult};
use super::types::{Account, LineInput};

/// Debit and credit totals of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl LineTotals {
    /// Sums the lines without validating them.
    #[must_use]
    pub fn of(lines: &[LineInput]) -> Self {
        lines.iter().fold(
            Self {
                debit: Decimal::ZERO,
                credit: Decimal::ZERO,
            },
            |acc, line| Self {
                debit: acc.debit + line.debit,
                credit: acc.credit + line.credit,
            },
        )
    }

    /// Returns true if debits equal credits within `epsilon`.
    #[must_use]
    pub fn is_balanced(self, epsilon: Decimal) -> bool {
        (self.debit - self.credit).abs() <= epsilon
    }
}

/// Validates the shape and balance of proposed lines.
///
/// Rules:
/// - at least two lines
/// - no negative amounts
/// - exactly one of debit/credit is non-zero per line
/// - total debit equals total credit within `epsilon`
///
/// # Errors
///
/// Returns the first rule violated, with 1-based line numbers.
pub fn validate_lines(lines: &[LineInput], epsilon: Decimal) -> LedgerResult<LineTotals> {
    if lines.len() < 2 {
        return Err(LedgerError::InsufficientLines);
    }

    for (index, line) in lines.iter().enumerate() {
        let line_no = index + 1;
        if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { line: line_no });
        }
        if line.debit.is_zero() == line.credit.is_zero() {
            return Err(LedgerError::InvalidLine { line: line_no });
        }
    }

    let totals = LineTotals::of(lines);
    if !totals.is_balanced(epsilon) {
        return Err(LedgerError::UnbalancedEntry {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}

/// Validates that an account can receive a journal line.
///
/// # Errors
///
/// Returns `AccountInactive` or `HeaderAccount`.
pub fn validate_postable(account: &Account) -> LedgerResult<()> {
    if !account.is_active {
        return Err(LedgerError::AccountInactive(account.id));
    }
    if account.is_header {
        return Err(LedgerError::HeaderAccount(account.id));
    }
    Ok(())
}
