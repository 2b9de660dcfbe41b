//! Shared fixtures for engine tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use neraca_shared::types::{AccountId, CashBankId, ContactId, PurchaseId, SaleId};

use crate::cashbank::CashBank;
use crate::documents::{
    PaymentMethod, Purchase, PurchaseStatus, Sale, SaleStatus, Settlement,
};
use crate::ledger::types::{Account, AccountType};
use crate::ledger::PostingService;
use crate::observability;
use crate::store::MemoryStore;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn posting_service() -> PostingService {
    PostingService::new(dec!(0.01), observability::noop())
}

/// Account codes of the seeded chart.
pub struct Chart {
    ids: HashMap<&'static str, AccountId>,
}

impl Chart {
    pub fn id(&self, code: &str) -> AccountId {
        self.ids[code]
    }
}

/// (code, name, type, parent code, is_header)
const CHART: &[(&str, &str, AccountType, Option<&str>, bool)] = &[
    ("1000", "Aset", AccountType::Asset, None, true),
    ("1100", "Kas dan Bank", AccountType::Asset, Some("1000"), true),
    ("1101", "Kas", AccountType::Asset, Some("1100"), false),
    ("1102", "Bank BCA", AccountType::Asset, Some("1100"), false),
    ("1201", "Piutang Usaha", AccountType::Asset, Some("1000"), false),
    ("1240", "PPN Masukan", AccountType::Asset, Some("1000"), false),
    ("1301", "Persediaan", AccountType::Asset, Some("1000"), false),
    ("2000", "Kewajiban", AccountType::Liability, None, true),
    ("2101", "Hutang Usaha", AccountType::Liability, Some("2000"), false),
    ("2103", "PPN Keluaran", AccountType::Liability, Some("2000"), false),
    ("2111", "Hutang PPh 21", AccountType::Liability, Some("2000"), false),
    ("2112", "Hutang PPh 23", AccountType::Liability, Some("2000"), false),
    ("3000", "Ekuitas", AccountType::Equity, None, true),
    ("3201", "Laba Ditahan", AccountType::Equity, Some("3000"), false),
    ("4000", "Pendapatan", AccountType::Revenue, None, true),
    ("4101", "Penjualan", AccountType::Revenue, Some("4000"), false),
    ("4102", "Pendapatan Jasa", AccountType::Revenue, Some("4000"), false),
    ("5000", "Beban", AccountType::Expense, None, true),
    ("5101", "Harga Pokok Penjualan", AccountType::Expense, Some("5000"), false),
    ("5201", "Beban Gaji", AccountType::Expense, Some("5000"), false),
];

/// Seeds a small Indonesian-style chart of accounts with zero balances.
pub async fn standard_chart() -> (MemoryStore, Chart) {
    let store = MemoryStore::new();
    let mut ids = HashMap::new();
    for (code, _, _, _, _) in CHART {
        ids.insert(*code, AccountId::new());
    }
    for (code, name, account_type, parent, is_header) in CHART {
        store
            .insert_account(Account {
                id: ids[code],
                code: (*code).to_string(),
                name: (*name).to_string(),
                account_type: *account_type,
                parent_id: parent.map(|p| ids[p]),
                balance: Decimal::ZERO,
                is_header: *is_header,
                is_active: true,
            })
            .await;
    }
    (store, Chart { ids })
}

/// Seeds a register with a balance but no transactions.
pub async fn cash_bank(
    store: &MemoryStore,
    code: &str,
    account_id: Option<AccountId>,
    balance: Decimal,
) -> CashBank {
    let cash_bank = CashBank {
        id: CashBankId::new(),
        code: code.into(),
        name: code.into(),
        account_id,
        balance,
        is_active: true,
    };
    store.insert_cash_bank(cash_bank.clone()).await;
    cash_bank
}

pub fn sale(
    status: SaleStatus,
    method: PaymentMethod,
    subtotal: Decimal,
    tax: Decimal,
) -> Sale {
    Sale {
        id: SaleId::new(),
        code: "INV-2026-0001".into(),
        customer_id: ContactId::new(),
        invoice_date: date(2026, 1, 10),
        status,
        payment_method: method,
        cash_bank_id: None,
        subtotal,
        tax_amount: tax,
        total_amount: subtotal + tax,
        settlement: Settlement::unpaid(subtotal + tax),
    }
}

pub fn purchase(
    status: PurchaseStatus,
    method: PaymentMethod,
    subtotal: Decimal,
    tax: Decimal,
) -> Purchase {
    Purchase {
        id: PurchaseId::new(),
        code: "PO-2026-0001".into(),
        vendor_id: ContactId::new(),
        bill_date: date(2026, 1, 12),
        status,
        payment_method: method,
        cash_bank_id: None,
        subtotal,
        tax_amount: tax,
        pph21_amount: Decimal::ZERO,
        pph23_amount: Decimal::ZERO,
        total_amount: subtotal + tax,
        settlement: Settlement::unpaid(subtotal + tax),
    }
}

pub fn shared(store: &MemoryStore) -> Arc<MemoryStore> {
    Arc::new(store.clone())
}
