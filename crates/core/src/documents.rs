//! Business documents that drive postings: sales invoices and purchase bills.
//!
//! The status gates defined here are shared by the event posters and the
//! payment allocator, so "may this document be posted" and "may this
//! document receive a payment" can never disagree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use neraca_shared::types::{CashBankId, ContactId, PurchaseId, SaleId};

/// How a document is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Paid in cash.
    Cash,
    /// Paid through a bank account.
    Bank,
    /// On credit terms (receivable/payable).
    Credit,
}

impl PaymentMethod {
    /// Maps a free-form method code to a method. Unknown codes are credit terms.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "CASH" | "TUNAI" => Self::Cash,
            "BANK" | "TRANSFER" | "BANK_TRANSFER" | "CHECK" | "CHEQUE" | "GIRO" => Self::Bank,
            _ => Self::Credit,
        }
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Bank => "BANK",
            Self::Credit => "CREDIT",
        }
    }
}

/// Sales invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    /// Being drafted.
    Draft,
    /// Awaiting confirmation.
    Pending,
    /// Confirmed but not invoiced.
    Confirmed,
    /// Delivered but not invoiced.
    Completed,
    /// Cancelled.
    Cancelled,
    /// Invoice issued.
    Invoiced,
    /// Invoice past due.
    Overdue,
    /// Fully paid.
    Paid,
}

impl SaleStatus {
    /// Returns true if the invoice is recognized in the ledger.
    ///
    /// Gates both journal posting and payment eligibility.
    #[must_use]
    pub const fn is_recognized(self) -> bool {
        matches!(self, Self::Invoiced | Self::Overdue | Self::Paid)
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Invoiced => "INVOICED",
            Self::Overdue => "OVERDUE",
            Self::Paid => "PAID",
        }
    }
}

impl std::str::FromStr for SaleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            "INVOICED" => Ok(Self::Invoiced),
            "OVERDUE" => Ok(Self::Overdue),
            "PAID" => Ok(Self::Paid),
            _ => Err(format!("Unknown sale status: {s}")),
        }
    }
}

/// Purchase bill status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    /// Being drafted.
    Draft,
    /// Submitted.
    Pending,
    /// Waiting for an approver.
    PendingApproval,
    /// Approved.
    Approved,
    /// Goods received.
    Completed,
    /// Fully paid.
    Paid,
    /// Cancelled.
    Cancelled,
}

impl PurchaseStatus {
    /// Returns true if the bill is recognized in the ledger.
    ///
    /// Gates both journal posting and payment eligibility.
    #[must_use]
    pub const fn is_recognized(self) -> bool {
        matches!(self, Self::Approved | Self::Completed | Self::Paid)
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Completed => "COMPLETED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PENDING" => Ok(Self::Pending),
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "APPROVED" => Ok(Self::Approved),
            "COMPLETED" => Ok(Self::Completed),
            "PAID" => Ok(Self::Paid),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown purchase status: {s}")),
        }
    }
}

/// How much of a document has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SettlementStatus {
    /// Nothing paid yet.
    Unpaid,
    /// Partially paid.
    Partial,
    /// Fully paid (matched).
    Settled,
}

impl SettlementStatus {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Partial => "PARTIAL",
            Self::Settled => "SETTLED",
        }
    }
}

impl std::str::FromStr for SettlementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNPAID" => Ok(Self::Unpaid),
            "PARTIAL" => Ok(Self::Partial),
            "SETTLED" => Ok(Self::Settled),
            _ => Err(format!("Unknown settlement status: {s}")),
        }
    }
}

/// Paid/outstanding tracking shared by invoices and bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Amount paid so far.
    pub paid_amount: Decimal,
    /// Amount still owed.
    pub outstanding_amount: Decimal,
    /// Derived settlement status.
    pub status: SettlementStatus,
}

impl Settlement {
    /// Creates an unpaid settlement for a document total.
    #[must_use]
    pub const fn unpaid(total: Decimal) -> Self {
        Self {
            paid_amount: Decimal::ZERO,
            outstanding_amount: total,
            status: SettlementStatus::Unpaid,
        }
    }

    /// Applies a payment. Outstanding within `epsilon` of zero snaps to zero.
    ///
    /// Returns true if the document is now fully settled.
    pub fn apply(&mut self, amount: Decimal, epsilon: Decimal) -> bool {
        self.paid_amount += amount;
        self.outstanding_amount -= amount;
        if self.outstanding_amount <= epsilon {
            self.outstanding_amount = Decimal::ZERO;
            self.status = SettlementStatus::Settled;
            true
        } else {
            self.status = SettlementStatus::Partial;
            false
        }
    }

    /// Undoes a previously applied payment.
    pub fn revert(&mut self, amount: Decimal) {
        self.paid_amount = (self.paid_amount - amount).max(Decimal::ZERO);
        self.outstanding_amount += amount;
        self.status = if self.paid_amount.is_zero() {
            SettlementStatus::Unpaid
        } else {
            SettlementStatus::Partial
        };
    }
}

/// A sales invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Unique identifier.
    pub id: SaleId,
    /// Invoice number.
    pub code: String,
    /// Customer.
    pub customer_id: ContactId,
    /// Invoice date (journal date).
    pub invoice_date: NaiveDate,
    /// Document status.
    pub status: SaleStatus,
    /// Settlement method.
    pub payment_method: PaymentMethod,
    /// Register used for cash/bank sales.
    pub cash_bank_id: Option<CashBankId>,
    /// Pre-tax amount.
    pub subtotal: Decimal,
    /// Output tax (PPN) amount.
    pub tax_amount: Decimal,
    /// Invoice total.
    pub total_amount: Decimal,
    /// Payment tracking.
    pub settlement: Settlement,
}

impl Sale {
    /// Applies a payment and moves the invoice to PAID once settled.
    pub fn apply_payment(&mut self, amount: Decimal, epsilon: Decimal) {
        if self.settlement.apply(amount, epsilon) {
            self.status = SaleStatus::Paid;
        }
    }

    /// Undoes a payment; a PAID invoice goes back to INVOICED.
    pub fn revert_payment(&mut self, amount: Decimal) {
        self.settlement.revert(amount);
        if self.status == SaleStatus::Paid {
            self.status = SaleStatus::Invoiced;
        }
    }
}

/// A purchase bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Unique identifier.
    pub id: PurchaseId,
    /// Bill number.
    pub code: String,
    /// Vendor.
    pub vendor_id: ContactId,
    /// Bill date (journal date).
    pub bill_date: NaiveDate,
    /// Document status.
    pub status: PurchaseStatus,
    /// Settlement method.
    pub payment_method: PaymentMethod,
    /// Register used for cash/bank purchases.
    pub cash_bank_id: Option<CashBankId>,
    /// Pre-tax amount.
    pub subtotal: Decimal,
    /// Input tax (PPN) amount.
    pub tax_amount: Decimal,
    /// PPh 21 withheld.
    pub pph21_amount: Decimal,
    /// PPh 23 withheld.
    pub pph23_amount: Decimal,
    /// Bill total, net of withholdings.
    pub total_amount: Decimal,
    /// Payment tracking.
    pub settlement: Settlement,
}

impl Purchase {
    /// Amount owed to the vendor: subtotal plus tax minus withholdings.
    #[must_use]
    pub fn net_payable(&self) -> Decimal {
        self.subtotal + self.tax_amount - self.pph21_amount - self.pph23_amount
    }

    /// Applies a payment and moves the bill to PAID once matched.
    pub fn apply_payment(&mut self, amount: Decimal, epsilon: Decimal) {
        if self.settlement.apply(amount, epsilon) {
            self.status = PurchaseStatus::Paid;
        }
    }

    /// Undoes a payment; a PAID bill goes back to APPROVED.
    pub fn revert_payment(&mut self, amount: Decimal) {
        self.settlement.revert(amount);
        if self.status == PurchaseStatus::Paid {
            self.status = PurchaseStatus::Approved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("cash", PaymentMethod::Cash)]
    #[case("BANK", PaymentMethod::Bank)]
    #[case("transfer", PaymentMethod::Bank)]
    #[case("CREDIT", PaymentMethod::Credit)]
    #[case("", PaymentMethod::Credit)]
    #[case("net30", PaymentMethod::Credit)]
    fn test_payment_method_from_code(#[case] code: &str, #[case] expected: PaymentMethod) {
        assert_eq!(PaymentMethod::from_code(code), expected);
    }

    #[test]
    fn test_sale_recognition_gate() {
        assert!(SaleStatus::Invoiced.is_recognized());
        assert!(SaleStatus::Overdue.is_recognized());
        assert!(SaleStatus::Paid.is_recognized());
        assert!(!SaleStatus::Draft.is_recognized());
        assert!(!SaleStatus::Confirmed.is_recognized());
        assert!(!SaleStatus::Cancelled.is_recognized());
    }

    #[test]
    fn test_purchase_recognition_gate() {
        assert!(PurchaseStatus::Approved.is_recognized());
        assert!(PurchaseStatus::Completed.is_recognized());
        assert!(PurchaseStatus::Paid.is_recognized());
        assert!(!PurchaseStatus::PendingApproval.is_recognized());
        assert!(!PurchaseStatus::Draft.is_recognized());
    }

    #[test]
    fn test_settlement_partial_then_settled() {
        let mut settlement = Settlement::unpaid(dec!(1000));
        assert!(!settlement.apply(dec!(400), dec!(0.01)));
        assert_eq!(settlement.status, SettlementStatus::Partial);
        assert_eq!(settlement.outstanding_amount, dec!(600));

        assert!(settlement.apply(dec!(599.995), dec!(0.01)));
        assert_eq!(settlement.outstanding_amount, Decimal::ZERO);
        assert_eq!(settlement.status, SettlementStatus::Settled);
    }

    #[test]
    fn test_settlement_revert() {
        let mut settlement = Settlement::unpaid(dec!(500));
        settlement.apply(dec!(500), dec!(0.01));
        settlement.revert(dec!(200));
        assert_eq!(settlement.paid_amount, dec!(300));
        assert_eq!(settlement.outstanding_amount, dec!(200));
        assert_eq!(settlement.status, SettlementStatus::Partial);

        settlement.revert(dec!(300));
        assert_eq!(settlement.status, SettlementStatus::Unpaid);
    }

    #[test]
    fn test_purchase_net_payable() {
        let purchase = Purchase {
            id: PurchaseId::new(),
            code: "PO-001".into(),
            vendor_id: ContactId::new(),
            bill_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            status: PurchaseStatus::Approved,
            payment_method: PaymentMethod::Credit,
            cash_bank_id: None,
            subtotal: dec!(1000000),
            tax_amount: dec!(110000),
            pph21_amount: dec!(0),
            pph23_amount: dec!(20000),
            total_amount: dec!(1090000),
            settlement: Settlement::unpaid(dec!(1090000)),
        };
        assert_eq!(purchase.net_payable(), dec!(1090000));
    }
}
