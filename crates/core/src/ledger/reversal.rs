//! Reversing entry construction.
//!
//! Posted entries are never edited. Undoing one means posting a new entry
//! whose lines are the originals with debit and credit swapped.

use super::types::{JournalEntry, JournalLine, LineInput};

/// Stateless helpers for building reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Creates reversing lines by swapping debits and credits.
    ///
    /// Accounts and amounts are preserved; descriptions are prefixed with
    /// "Reversal: ".
    #[must_use]
    pub fn reversing_lines(original: &[JournalLine]) -> Vec<LineInput> {
        original
            .iter()
            .map(|line| {
                let mut reversed = line.to_input().swapped();
                reversed.description = format!("Reversal: {}", line.description);
                reversed
            })
            .collect()
    }

    /// Code for the reversal of an entry.
    #[must_use]
    pub fn reversal_code(original_code: &str) -> String {
        format!("REV-{original_code}")
    }

    /// Description for the reversal of an entry.
    #[must_use]
    pub fn reversal_description(original: &JournalEntry, reason: &str) -> String {
        if reason.is_empty() {
            format!("Reversal of {}", original.code)
        } else {
            format!("Reversal of {}. Reason: {reason}", original.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use neraca_shared::types::{AccountId, JournalEntryId, JournalLineId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::ledger::types::EntryStatus;

    fn line(entry_id: JournalEntryId, number: i32, debit: Decimal, credit: Decimal) -> JournalLine {
        JournalLine {
            id: JournalLineId::new(),
            entry_id,
            account_id: AccountId::new(),
            line_number: number,
            description: format!("line {number}"),
            debit,
            credit,
        }
    }

    fn entry(code: &str) -> JournalEntry {
        JournalEntry {
            id: JournalEntryId::new(),
            code: code.into(),
            entry_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            description: String::new(),
            source: None,
            status: EntryStatus::Posted,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            is_balanced: true,
            reversal_of: None,
            reversed_by: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reversing_lines_swap_sides() {
        let id = JournalEntryId::new();
        let original = vec![
            line(id, 1, dec!(50), dec!(0)),
            line(id, 2, dec!(30), dec!(0)),
            line(id, 3, dec!(0), dec!(80)),
        ];

        let reversed = ReversalService::reversing_lines(&original);

        assert_eq!(reversed.len(), 3);
        assert_eq!(reversed[0].credit, dec!(50));
        assert_eq!(reversed[1].credit, dec!(30));
        assert_eq!(reversed[2].debit, dec!(80));
        assert_eq!(reversed[0].account_id, original[0].account_id);
        assert_eq!(reversed[2].description, "Reversal: line 3");
    }

    #[test]
    fn test_reversal_code_and_description() {
        let original = entry("CLO-2026-01-01-31");
        assert_eq!(
            ReversalService::reversal_code(&original.code),
            "REV-CLO-2026-01-01-31"
        );
        assert_eq!(
            ReversalService::reversal_description(&original, "late invoice"),
            "Reversal of CLO-2026-01-01-31. Reason: late invoice"
        );
        assert_eq!(
            ReversalService::reversal_description(&original, ""),
            "Reversal of CLO-2026-01-01-31"
        );
    }
}
