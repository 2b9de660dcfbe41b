//! Entity prelude.

pub use super::accounting_periods::Entity as AccountingPeriods;
pub use super::accounts::Entity as Accounts;
pub use super::cash_bank_transactions::Entity as CashBankTransactions;
pub use super::cash_banks::Entity as CashBanks;
pub use super::journal_entries::Entity as JournalEntries;
pub use super::journal_lines::Entity as JournalLines;
pub use super::payment_allocations::Entity as PaymentAllocations;
pub use super::payments::Entity as Payments;
pub use super::purchases::Entity as Purchases;
pub use super::sales::Entity as Sales;
