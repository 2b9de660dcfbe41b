//! Ledger domain types for journal posting.
//!
//! Accounts form a single-parent tree. Journal entries are immutable once
//! posted; corrections are made with reversal entries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use neraca_shared::types::{AccountId, JournalEntryId, JournalLineId, UserId};

/// Account classification.
///
/// In double-entry bookkeeping:
/// - Debits increase asset/expense accounts
/// - Credits increase liability/equity/revenue accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// Resources owned (cash, receivables, inventory).
    Asset,
    /// Obligations (payables, tax payable).
    Liability,
    /// Owner's interest (capital, retained earnings).
    Equity,
    /// Income, zeroed at period close.
    Revenue,
    /// Costs, zeroed at period close.
    Expense,
}

impl AccountType {
    /// Every account type, in chart order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Returns true for debit-normal accounts (Asset, Expense).
    #[must_use]
    pub const fn is_debit_normal(self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }

    /// Returns true for temporary accounts that are zeroed at period close.
    #[must_use]
    pub const fn is_temporary(self) -> bool {
        matches!(self, Self::Revenue | Self::Expense)
    }

    /// Calculates the balance change a line causes on an account of this type.
    ///
    /// - Asset/Expense: `debit - credit`
    /// - Liability/Equity/Revenue: `credit - debit`
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        if self.is_debit_normal() {
            debit - credit
        } else {
            credit - debit
        }
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ASSET" => Ok(Self::Asset),
            "LIABILITY" => Ok(Self::Liability),
            "EQUITY" => Ok(Self::Equity),
            "REVENUE" => Ok(Self::Revenue),
            "EXPENSE" => Ok(Self::Expense),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// A chart of accounts entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Hierarchical account code (e.g. "1101").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Parent header account.
    pub parent_id: Option<AccountId>,
    /// Running balance in normal-balance polarity.
    pub balance: Decimal,
    /// Aggregation node; never posted to directly.
    pub is_header: bool,
    /// Inactive accounts reject postings.
    pub is_active: bool,
}

/// Journal entry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    /// Not yet posted; has no balance effect.
    Draft,
    /// Posted; balances have been updated.
    Posted,
    /// Undone by a reversal entry.
    Reversed,
}

impl EntryStatus {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Reversed => "REVERSED",
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "POSTED" => Ok(Self::Posted),
            "REVERSED" => Ok(Self::Reversed),
            _ => Err(format!("Unknown entry status: {s}")),
        }
    }
}

/// Kind of business object a journal entry originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Sales invoice.
    Sales,
    /// Customer payment against sales invoices.
    SalesPayment,
    /// Purchase bill.
    Purchase,
    /// Payment to a vendor against purchase bills.
    VendorPayment,
    /// Period or fiscal-year closing.
    Closing,
    /// Reversal of another journal entry.
    Reversal,
    /// Manually keyed entry.
    Manual,
}

impl SourceType {
    /// Returns the canonical reference type string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sales => "SALES",
            Self::SalesPayment => "SALES_PAYMENT",
            Self::Purchase => "PURCHASE",
            Self::VendorPayment => "VENDOR_PAYMENT",
            Self::Closing => "CLOSING",
            Self::Reversal => "REVERSAL",
            Self::Manual => "MANUAL",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SALES" => Ok(Self::Sales),
            "SALES_PAYMENT" => Ok(Self::SalesPayment),
            "PURCHASE" => Ok(Self::Purchase),
            "VENDOR_PAYMENT" => Ok(Self::VendorPayment),
            "CLOSING" => Ok(Self::Closing),
            "REVERSAL" => Ok(Self::Reversal),
            "MANUAL" => Ok(Self::Manual),
            _ => Err(format!("Unknown source type: {s}")),
        }
    }
}

/// Ties a journal entry back to its originating business object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Kind of source object.
    pub source_type: SourceType,
    /// Source object ID.
    pub source_id: Uuid,
}

impl SourceRef {
    /// Creates a source reference.
    #[must_use]
    pub fn new(source_type: SourceType, source_id: impl Into<Uuid>) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source_type, self.source_id)
    }
}

/// A proposed journal line. Exactly one of `debit`/`credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    /// Account to post to.
    pub account_id: AccountId,
    /// Debit amount (zero for credit lines).
    pub debit: Decimal,
    /// Credit amount (zero for debit lines).
    pub credit: Decimal,
    /// Line description.
    pub description: String,
}

impl LineInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: description.into(),
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: description.into(),
        }
    }

    /// Returns the same line with debit and credit swapped.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            account_id: self.account_id,
            debit: self.credit,
            credit: self.debit,
            description: self.description.clone(),
        }
    }
}

/// Request to post a balanced journal entry.
#[derive(Debug, Clone)]
pub struct PostingRequest {
    /// Pre-generated human-readable code; made unique on collision.
    pub code: String,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Entry description.
    pub description: String,
    /// Originating business object, if any.
    pub source: Option<SourceRef>,
    /// Ordered lines.
    pub lines: Vec<LineInput>,
    /// Acting user.
    pub created_by: Option<UserId>,
}

/// A persisted journal entry header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Unique human-readable code.
    pub code: String,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Description.
    pub description: String,
    /// Originating business object.
    pub source: Option<SourceRef>,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Sum of line debits.
    pub total_debit: Decimal,
    /// Sum of line credits.
    pub total_credit: Decimal,
    /// Whether debits equal credits within tolerance.
    pub is_balanced: bool,
    /// The entry this one reverses.
    pub reversal_of: Option<JournalEntryId>,
    /// The entry that reversed this one.
    pub reversed_by: Option<JournalEntryId>,
    /// Acting user.
    pub created_by: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A persisted journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Unique identifier.
    pub id: JournalLineId,
    /// Parent entry.
    pub entry_id: JournalEntryId,
    /// Posted account.
    pub account_id: AccountId,
    /// 1-based position within the entry.
    pub line_number: i32,
    /// Line description.
    pub description: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

impl JournalLine {
    /// Converts the persisted line back into an input line.
    #[must_use]
    pub fn to_input(&self) -> LineInput {
        LineInput {
            account_id: self.account_id,
            debit: self.debit,
            credit: self.credit,
            description: self.description.clone(),
        }
    }
}

/// Request to reverse a posted journal entry.
#[derive(Debug, Clone)]
pub struct ReversalRequest {
    /// Entry to reverse.
    pub entry_id: JournalEntryId,
    /// Accounting date of the reversal.
    pub entry_date: NaiveDate,
    /// Reason recorded on the reversal.
    pub reason: String,
    /// Acting user.
    pub created_by: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[rstest]
    #[case(AccountType::Asset, dec!(100), dec!(0), dec!(100))]
    #[case(AccountType::Expense, dec!(0), dec!(40), dec!(-40))]
    #[case(AccountType::Liability, dec!(0), dec!(100), dec!(100))]
    #[case(AccountType::Equity, dec!(25), dec!(0), dec!(-25))]
    #[case(AccountType::Revenue, dec!(10), dec!(30), dec!(20))]
    fn test_balance_change_follows_normal_balance(
        #[case] account_type: AccountType,
        #[case] debit: Decimal,
        #[case] credit: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(account_type.balance_change(debit, credit), expected);
    }

    #[test]
    fn test_temporary_accounts() {
        assert!(AccountType::Revenue.is_temporary());
        assert!(AccountType::Expense.is_temporary());
        assert!(!AccountType::Asset.is_temporary());
        assert!(!AccountType::Liability.is_temporary());
        assert!(!AccountType::Equity.is_temporary());
        let temporary: Vec<_> = AccountType::ALL
            .into_iter()
            .filter(|t| t.is_temporary())
            .collect();
        assert_eq!(temporary, vec![AccountType::Revenue, AccountType::Expense]);
    }

    #[test]
    fn test_account_type_parse() {
        assert_eq!(AccountType::from_str("equity").unwrap(), AccountType::Equity);
        assert_eq!(AccountType::from_str("ASSET").unwrap(), AccountType::Asset);
        assert!(AccountType::from_str("capital").is_err());
    }

    #[test]
    fn test_source_type_round_trip() {
        for source_type in [
            SourceType::Sales,
            SourceType::SalesPayment,
            SourceType::Purchase,
            SourceType::VendorPayment,
            SourceType::Closing,
            SourceType::Reversal,
            SourceType::Manual,
        ] {
            assert_eq!(SourceType::from_str(source_type.as_str()).unwrap(), source_type);
        }
    }

    #[test]
    fn test_line_swapped() {
        let line = LineInput::debit(AccountId::new(), dec!(12.50), "Cash");
        let swapped = line.swapped();
        assert_eq!(swapped.debit, Decimal::ZERO);
        assert_eq!(swapped.credit, dec!(12.50));
        assert_eq!(swapped.account_id, line.account_id);
    }
}
