//! Development data seeder for the Neraca ledger.
//!
//! Seeds a small chart of accounts, a cash drawer and a bank register linked
//! to their COA accounts, and one draft sale and purchase ready to be posted.
//! Every seed is skipped when a row with the same code already exists, so the
//! seeder can be run repeatedly.
//!
//! Usage: cargo run --bin seeder

use std::collections::HashMap;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use neraca_core::cashbank::CashBank;
use neraca_core::documents::{
    PaymentMethod, Purchase, PurchaseStatus, Sale, SaleStatus, Settlement,
};
use neraca_core::ledger::{Account, AccountType};
use neraca_db::entities::{accounts, cash_banks, purchases, sales};
use neraca_db::repositories::convert::{
    account_active, cash_bank_active, purchase_active, sale_active,
};
use neraca_shared::AppConfig;
use neraca_shared::types::{AccountId, CashBankId, ContactId, PurchaseId, SaleId};

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
    ("3101", "Modal Disetor", AccountType::Equity, Some("3000"), false),
    ("3201", "Laba Ditahan", AccountType::Equity, Some("3000"), false),
    ("4000", "Pendapatan", AccountType::Revenue, None, true),
    ("4101", "Penjualan", AccountType::Revenue, Some("4000"), false),
    ("4102", "Pendapatan Jasa", AccountType::Revenue, Some("4000"), false),
    ("5000", "Beban", AccountType::Expense, None, true),
    ("5101", "Harga Pokok Penjualan", AccountType::Expense, Some("5000"), false),
    ("5201", "Beban Gaji", AccountType::Expense, Some("5000"), false),
    ("5301", "Beban Sewa", AccountType::Expense, Some("5000"), false),
];

/// (code, name, linked account code)
const REGISTERS: &[(&str, &str, &str)] = &[
    ("KAS-01", "Kas Kecil", "1101"),
    ("BCA-01", "Rekening BCA", "1102"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = neraca_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;

    println!("Seeding chart of accounts...");
    let chart = seed_chart(&db).await?;

    println!("Seeding cash/bank registers...");
    let registers = seed_registers(&db, &chart).await?;

    println!("Seeding draft documents...");
    seed_documents(&db, &registers).await?;

    println!("Seeding complete!");
    Ok(())
}

fn seed_date() -> NaiveDate {
    Utc::now().date_naive()
}

/// Seeds the chart and returns account IDs by code, including pre-existing rows.
async fn seed_chart(db: &DatabaseConnection) -> anyhow::Result<HashMap<String, AccountId>> {
    let mut ids: HashMap<String, AccountId> = accounts::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|model| (model.code, AccountId::from(model.id)))
        .collect();

    // CHART lists parents before children
    for (code, name, account_type, parent, is_header) in CHART {
        if ids.contains_key(*code) {
            println!("  Account {code} already exists, skipping...");
            continue;
        }
        let parent_id = match parent {
            Some(parent) => Some(
                *ids.get(*parent)
                    .with_context(|| format!("parent account {parent} missing"))?,
            ),
            None => None,
        };
        let account = Account {
            id: AccountId::new(),
            code: (*code).to_string(),
            name: (*name).to_string(),
            account_type: *account_type,
            parent_id,
            balance: Decimal::ZERO,
            is_header: *is_header,
            is_active: true,
        };
        account_active(&account).insert(db).await?;
        println!("  Created account {code} {name}");
        ids.insert(account.code, account.id);
    }
    Ok(ids)
}

async fn seed_registers(
    db: &DatabaseConnection,
    chart: &HashMap<String, AccountId>,
) -> anyhow::Result<HashMap<&'static str, CashBankId>> {
    let mut ids = HashMap::new();
    for (code, name, account_code) in REGISTERS {
        if let Some(existing) = cash_banks::Entity::find()
            .filter(cash_banks::Column::Code.eq(*code))
            .one(db)
            .await?
        {
            println!("  Register {code} already exists, skipping...");
            ids.insert(*code, CashBankId::from(existing.id));
            continue;
        }
        let register = CashBank {
            id: CashBankId::new(),
            code: (*code).to_string(),
            name: (*name).to_string(),
            account_id: chart.get(*account_code).copied(),
            balance: Decimal::ZERO,
            is_active: true,
        };
        cash_bank_active(&register).insert(db).await?;
        println!("  Created register {code} linked to {account_code}");
        ids.insert(*code, register.id);
    }
    Ok(ids)
}

async fn seed_documents(
    db: &DatabaseConnection,
    registers: &HashMap<&'static str, CashBankId>,
) -> anyhow::Result<()> {
    let sale_code = "INV-SEED-0001";
    if sales::Entity::find()
        .filter(sales::Column::Code.eq(sale_code))
        .one(db)
        .await?
        .is_some()
    {
        println!("  Sale {sale_code} already exists, skipping...");
    } else {
        let (subtotal, tax) = (dec!(1000000), dec!(110000));
        let sale = Sale {
            id: SaleId::new(),
            code: sale_code.to_string(),
            customer_id: ContactId::new(),
            invoice_date: seed_date(),
            status: SaleStatus::Draft,
            payment_method: PaymentMethod::Bank,
            cash_bank_id: registers.get("BCA-01").copied(),
            subtotal,
            tax_amount: tax,
            total_amount: subtotal + tax,
            settlement: Settlement::unpaid(subtotal + tax),
        };
        sale_active(&sale).insert(db).await?;
        println!("  Created draft sale {sale_code}");
    }

    let purchase_code = "PO-SEED-0001";
    if purchases::Entity::find()
        .filter(purchases::Column::Code.eq(purchase_code))
        .one(db)
        .await?
        .is_some()
    {
        println!("  Purchase {purchase_code} already exists, skipping...");
    } else {
        let (subtotal, tax, pph23) = (dec!(2000000), dec!(220000), dec!(40000));
        let total = subtotal + tax - pph23;
        let purchase = Purchase {
            id: PurchaseId::new(),
            code: purchase_code.to_string(),
            vendor_id: ContactId::new(),
            bill_date: seed_date(),
            status: PurchaseStatus::Draft,
            payment_method: PaymentMethod::Credit,
            cash_bank_id: None,
            subtotal,
            tax_amount: tax,
            pph21_amount: Decimal::ZERO,
            pph23_amount: pph23,
            total_amount: total,
            settlement: Settlement::unpaid(total),
        };
        purchase_active(&purchase).insert(db).await?;
        println!("  Created draft purchase {purchase_code}");
    }
    Ok(())
}
