//! Journal templates: business documents mapped to debit and credit legs.
//!
//! A template is pure. It says which roles get which amounts; the
//! [`EventPoster`](super::EventPoster) resolves roles to accounts and posts.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use neraca_shared::types::AccountId;

use super::accounts::{AccountRole, LegAccount};
use crate::documents::{PaymentMethod, Purchase, Sale};
use crate::ledger::types::{SourceRef, SourceType};
use crate::payment::{CounterpartyRole, Payment, PaymentStatus};

/// One side of a journal line before account resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    /// Where to post.
    pub account: LegAccount,
    /// Amount; zero-amount legs are dropped.
    pub amount: Decimal,
    /// Line description.
    pub description: String,
}

impl Leg {
    fn new(account: LegAccount, amount: Decimal, description: String) -> Self {
        Self {
            account,
            amount,
            description,
        }
    }
}

/// Maps a business object to a balanced set of legs.
pub trait JournalTemplate {
    /// Guard key of the produced entry.
    fn source(&self) -> SourceRef;

    /// Entry code.
    fn code(&self) -> String;

    /// Accounting date.
    fn entry_date(&self) -> NaiveDate;

    /// Entry description.
    fn description(&self) -> String;

    /// Whether the object's current status is recognized in the ledger.
    fn qualifies(&self) -> bool;

    /// Debit legs.
    fn debit_legs(&self) -> Vec<Leg>;

    /// Credit legs.
    fn credit_legs(&self) -> Vec<Leg>;
}

/// Sales invoice journal.
///
/// Debit cash, bank, or receivable by payment method for subtotal plus tax;
/// credit revenue for the subtotal and output tax for the tax.
#[derive(Debug)]
pub struct SaleTemplate<'a> {
    sale: &'a Sale,
    linked_account: Option<AccountId>,
}

impl<'a> SaleTemplate<'a> {
    /// `linked_account` is the GL account of the sale's register, if any.
    #[must_use]
    pub fn new(sale: &'a Sale, linked_account: Option<AccountId>) -> Self {
        Self {
            sale,
            linked_account,
        }
    }
}

impl JournalTemplate for SaleTemplate<'_> {
    fn source(&self) -> SourceRef {
        SourceRef::new(SourceType::Sales, self.sale.id)
    }

    fn code(&self) -> String {
        format!("SJ-{}", self.sale.code)
    }

    fn entry_date(&self) -> NaiveDate {
        self.sale.invoice_date
    }

    fn description(&self) -> String {
        format!("Sales invoice {}", self.sale.code)
    }

    fn qualifies(&self) -> bool {
        self.sale.status.is_recognized()
    }

    fn debit_legs(&self) -> Vec<Leg> {
        let account = match self.sale.payment_method {
            PaymentMethod::Cash => LegAccount::Role(AccountRole::SalesCash),
            PaymentMethod::Bank => LegAccount::Linked {
                account: self.linked_account,
                fallback: AccountRole::SalesBank,
            },
            PaymentMethod::Credit => LegAccount::Role(AccountRole::SalesReceivable),
        };
        vec![Leg::new(
            account,
            self.sale.subtotal + self.sale.tax_amount,
            format!("{} {}", self.sale.payment_method.as_str(), self.sale.code),
        )]
    }

    fn credit_legs(&self) -> Vec<Leg> {
        vec![
            Leg::new(
                LegAccount::Role(AccountRole::SalesRevenue),
                self.sale.subtotal,
                format!("Revenue {}", self.sale.code),
            ),
            Leg::new(
                LegAccount::Role(AccountRole::SalesOutputTax),
                self.sale.tax_amount,
                format!("Output tax {}", self.sale.code),
            ),
        ]
    }
}

/// Purchase bill journal.
///
/// Debit inventory and input tax; credit the net payable to cash, bank, or
/// payables by method, and the withholdings to their liabilities.
#[derive(Debug)]
pub struct PurchaseTemplate<'a> {
    purchase: &'a Purchase,
    linked_account: Option<AccountId>,
}

impl<'a> PurchaseTemplate<'a> {
    /// `linked_account` is the GL account of the purchase's register, if any.
    #[must_use]
    pub fn new(purchase: &'a Purchase, linked_account: Option<AccountId>) -> Self {
        Self {
            purchase,
            linked_account,
        }
    }
}

impl JournalTemplate for PurchaseTemplate<'_> {
    fn source(&self) -> SourceRef {
        SourceRef::new(SourceType::Purchase, self.purchase.id)
    }

    fn code(&self) -> String {
        format!("PB-{}", self.purchase.code)
    }

    fn entry_date(&self) -> NaiveDate {
        self.purchase.bill_date
    }

    fn description(&self) -> String {
        format!("Purchase bill {}", self.purchase.code)
    }

    fn qualifies(&self) -> bool {
        self.purchase.status.is_recognized()
    }

    fn debit_legs(&self) -> Vec<Leg> {
        let code = &self.purchase.code;
        vec![
            Leg::new(
                LegAccount::Role(AccountRole::PurchaseInventory),
                self.purchase.subtotal,
                format!("Inventory {code}"),
            ),
            Leg::new(
                LegAccount::Role(AccountRole::PurchaseInputTax),
                self.purchase.tax_amount,
                format!("Input tax {code}"),
            ),
        ]
    }

    fn credit_legs(&self) -> Vec<Leg> {
        let code = &self.purchase.code;
        let settlement = match self.purchase.payment_method {
            PaymentMethod::Cash => LegAccount::Role(AccountRole::PurchaseCash),
            PaymentMethod::Bank => LegAccount::Linked {
                account: self.linked_account,
                fallback: AccountRole::PurchaseBank,
            },
            PaymentMethod::Credit => LegAccount::Role(AccountRole::PurchasePayable),
        };
        vec![
            Leg::new(
                settlement,
                self.purchase.net_payable(),
                format!("{} {code}", self.purchase.payment_method.as_str()),
            ),
            Leg::new(
                LegAccount::Role(AccountRole::WithholdingPph21),
                self.purchase.pph21_amount,
                format!("PPh 21 {code}"),
            ),
            Leg::new(
                LegAccount::Role(AccountRole::WithholdingPph23),
                self.purchase.pph23_amount,
                format!("PPh 23 {code}"),
            ),
        ]
    }
}

/// Payment journal for either side of the business.
///
/// Receipts debit the register and credit receivables; vendor payments debit
/// payables and credit the register.
#[derive(Debug)]
pub struct PaymentTemplate<'a> {
    payment: &'a Payment,
    linked_account: Option<AccountId>,
}

impl<'a> PaymentTemplate<'a> {
    /// `linked_account` is the GL account of the payment's register, if any.
    #[must_use]
    pub fn new(payment: &'a Payment, linked_account: Option<AccountId>) -> Self {
        Self {
            payment,
            linked_account,
        }
    }

    fn register_leg(&self, cash: AccountRole, bank: AccountRole) -> LegAccount {
        LegAccount::Linked {
            account: self.linked_account,
            fallback: match self.payment.method {
                PaymentMethod::Cash => cash,
                PaymentMethod::Bank | PaymentMethod::Credit => bank,
            },
        }
    }
}

impl JournalTemplate for PaymentTemplate<'_> {
    fn source(&self) -> SourceRef {
        let source_type = match self.payment.role {
            CounterpartyRole::Receivable => SourceType::SalesPayment,
            CounterpartyRole::Payable => SourceType::VendorPayment,
        };
        SourceRef::new(source_type, self.payment.id)
    }

    fn code(&self) -> String {
        match self.payment.role {
            CounterpartyRole::Receivable => format!("PJ-{}", self.payment.code),
            CounterpartyRole::Payable => format!("PV-{}", self.payment.code),
        }
    }

    fn entry_date(&self) -> NaiveDate {
        self.payment.payment_date
    }

    fn description(&self) -> String {
        match self.payment.role {
            CounterpartyRole::Receivable => format!("Customer payment {}", self.payment.code),
            CounterpartyRole::Payable => format!("Vendor payment {}", self.payment.code),
        }
    }

    fn qualifies(&self) -> bool {
        self.payment.status != PaymentStatus::Failed && self.payment.amount > Decimal::ZERO
    }

    fn debit_legs(&self) -> Vec<Leg> {
        let account = match self.payment.role {
            CounterpartyRole::Receivable => {
                self.register_leg(AccountRole::SalesCash, AccountRole::SalesBank)
            }
            CounterpartyRole::Payable => LegAccount::Role(AccountRole::PurchasePayable),
        };
        vec![Leg::new(account, self.payment.amount, self.description())]
    }

    fn credit_legs(&self) -> Vec<Leg> {
        let account = match self.payment.role {
            CounterpartyRole::Receivable => LegAccount::Role(AccountRole::SalesReceivable),
            CounterpartyRole::Payable => {
                self.register_leg(AccountRole::PurchaseCash, AccountRole::PurchaseBank)
            }
        };
        vec![Leg::new(account, self.payment.amount, self.description())]
    }
}
