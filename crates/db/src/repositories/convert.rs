//! Conversions between `SeaORM` models and engine domain types.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{DbErr, Set, SqlErr};

use neraca_core::cashbank::{CashBank, CashBankReference, CashBankTransaction};
use neraca_core::closing::{AccountingPeriod, PeriodKind};
use neraca_core::documents::{
    PaymentMethod, Purchase, PurchaseStatus, Sale, SaleStatus, Settlement, SettlementStatus,
};
use neraca_core::ledger::{
    Account, AccountType, EntryStatus, JournalEntry, JournalLine, SourceRef, SourceType,
};
use neraca_core::payment::{
    AllocationTarget, CounterpartyRole, Payment, PaymentAllocation, PaymentStatus,
};
use neraca_core::store::{StoreError, StoreResult};

use crate::entities::{
    accounting_periods, accounts, cash_bank_transactions, cash_banks, journal_entries,
    journal_lines, payment_allocations, payments, purchases, sales,
};

/// Maps a database error onto the storage seam's error taxonomy.
pub fn db_err(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return StoreError::UniqueViolation(detail);
    }
    if matches!(err, DbErr::RecordNotUpdated) {
        return StoreError::Missing(err.to_string());
    }
    let message = err.to_string();
    // SQLSTATE 40001, 40P01, 55P03
    if message.contains("could not serialize")
        || message.contains("deadlock detected")
        || message.contains("lock timeout")
        || message.contains("could not obtain lock")
    {
        StoreError::Conflict(message)
    } else {
        StoreError::Backend(message)
    }
}

fn parse<T: FromStr<Err = String>>(value: &str) -> StoreResult<T> {
    T::from_str(value).map_err(StoreError::Backend)
}

fn utc(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn fixed(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.fixed_offset()
}

// ========== Accounts ==========

impl TryFrom<accounts::Model> for Account {
    type Error = StoreError;

    fn try_from(model: accounts::Model) -> StoreResult<Self> {
        Ok(Self {
            id: model.id.into(),
            code: model.code,
            name: model.name,
            account_type: parse::<AccountType>(&model.account_type)?,
            parent_id: model.parent_id.map(Into::into),
            balance: model.balance,
            is_header: model.is_header,
            is_active: model.is_active,
        })
    }
}

/// Builds an insertable account row.
pub fn account_active(account: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        code: Set(account.code.clone()),
        name: Set(account.name.clone()),
        account_type: Set(account.account_type.as_str().to_string()),
        parent_id: Set(account.parent_id.map(|id| id.into_inner())),
        balance: Set(account.balance),
        is_header: Set(account.is_header),
        is_active: Set(account.is_active),
        created_at: Set(fixed(Utc::now())),
    }
}

// ========== Journal ==========

impl TryFrom<journal_entries::Model> for JournalEntry {
    type Error = StoreError;

    fn try_from(model: journal_entries::Model) -> StoreResult<Self> {
        let source = match (model.source_type, model.source_id) {
            (Some(source_type), Some(source_id)) => Some(SourceRef::new(
                parse::<SourceType>(&source_type)?,
                source_id,
            )),
            _ => None,
        };
        Ok(Self {
            id: model.id.into(),
            code: model.code,
            entry_date: model.entry_date,
            description: model.description,
            source,
            status: parse::<EntryStatus>(&model.status)?,
            total_debit: model.total_debit,
            total_credit: model.total_credit,
            is_balanced: model.is_balanced,
            reversal_of: model.reversal_of.map(Into::into),
            reversed_by: model.reversed_by.map(Into::into),
            created_by: model.created_by.map(Into::into),
            created_at: utc(model.created_at),
        })
    }
}

/// Builds an insertable entry row.
pub fn entry_active(entry: &JournalEntry) -> journal_entries::ActiveModel {
    journal_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        code: Set(entry.code.clone()),
        entry_date: Set(entry.entry_date),
        description: Set(entry.description.clone()),
        source_type: Set(entry.source.map(|s| s.source_type.as_str().to_string())),
        source_id: Set(entry.source.map(|s| s.source_id)),
        status: Set(entry.status.as_str().to_string()),
        total_debit: Set(entry.total_debit),
        total_credit: Set(entry.total_credit),
        is_balanced: Set(entry.is_balanced),
        reversal_of: Set(entry.reversal_of.map(|id| id.into_inner())),
        reversed_by: Set(entry.reversed_by.map(|id| id.into_inner())),
        created_by: Set(entry.created_by.map(|id| id.into_inner())),
        created_at: Set(fixed(entry.created_at)),
    }
}

impl From<journal_lines::Model> for JournalLine {
    fn from(model: journal_lines::Model) -> Self {
        Self {
            id: model.id.into(),
            entry_id: model.entry_id.into(),
            account_id: model.account_id.into(),
            line_number: model.line_number,
            description: model.description,
            debit: model.debit,
            credit: model.credit,
        }
    }
}

/// Builds an insertable line row.
pub fn line_active(line: &JournalLine) -> journal_lines::ActiveModel {
    journal_lines::ActiveModel {
        id: Set(line.id.into_inner()),
        entry_id: Set(line.entry_id.into_inner()),
        account_id: Set(line.account_id.into_inner()),
        line_number: Set(line.line_number),
        description: Set(line.description.clone()),
        debit: Set(line.debit),
        credit: Set(line.credit),
    }
}

// ========== Cash & Bank ==========

impl From<cash_banks::Model> for CashBank {
    fn from(model: cash_banks::Model) -> Self {
        Self {
            id: model.id.into(),
            code: model.code,
            name: model.name,
            account_id: model.account_id.map(Into::into),
            balance: model.balance,
            is_active: model.is_active,
        }
    }
}

/// Builds an insertable register row.
pub fn cash_bank_active(cash_bank: &CashBank) -> cash_banks::ActiveModel {
    cash_banks::ActiveModel {
        id: Set(cash_bank.id.into_inner()),
        code: Set(cash_bank.code.clone()),
        name: Set(cash_bank.name.clone()),
        account_id: Set(cash_bank.account_id.map(|id| id.into_inner())),
        balance: Set(cash_bank.balance),
        is_active: Set(cash_bank.is_active),
    }
}

impl TryFrom<cash_bank_transactions::Model> for CashBankTransaction {
    type Error = StoreError;

    fn try_from(model: cash_bank_transactions::Model) -> StoreResult<Self> {
        Ok(Self {
            id: model.id.into(),
            cash_bank_id: model.cash_bank_id.into(),
            amount: model.amount,
            balance_after: model.balance_after,
            reference_type: parse::<CashBankReference>(&model.reference_type)?,
            reference_id: model.reference_id,
            transaction_date: model.transaction_date,
            notes: model.notes,
            deleted_at: model.deleted_at.map(utc),
        })
    }
}

/// Builds an insertable subsidiary transaction row.
pub fn cash_bank_transaction_active(
    transaction: &CashBankTransaction,
) -> cash_bank_transactions::ActiveModel {
    cash_bank_transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        cash_bank_id: Set(transaction.cash_bank_id.into_inner()),
        amount: Set(transaction.amount),
        balance_after: Set(transaction.balance_after),
        reference_type: Set(transaction.reference_type.as_str().to_string()),
        reference_id: Set(transaction.reference_id),
        transaction_date: Set(transaction.transaction_date),
        notes: Set(transaction.notes.clone()),
        deleted_at: Set(transaction.deleted_at.map(fixed)),
        created_at: Set(fixed(Utc::now())),
    }
}

// ========== Sales & Purchases ==========

fn settlement(
    paid_amount: rust_decimal::Decimal,
    outstanding_amount: rust_decimal::Decimal,
    status: &str,
) -> StoreResult<Settlement> {
    Ok(Settlement {
        paid_amount,
        outstanding_amount,
        status: parse::<SettlementStatus>(status)?,
    })
}

impl TryFrom<sales::Model> for Sale {
    type Error = StoreError;

    fn try_from(model: sales::Model) -> StoreResult<Self> {
        Ok(Self {
            id: model.id.into(),
            code: model.code,
            customer_id: model.customer_id.into(),
            invoice_date: model.invoice_date,
            status: parse::<SaleStatus>(&model.status)?,
            payment_method: PaymentMethod::from_code(&model.payment_method),
            cash_bank_id: model.cash_bank_id.map(Into::into),
            subtotal: model.subtotal,
            tax_amount: model.tax_amount,
            total_amount: model.total_amount,
            settlement: settlement(
                model.paid_amount,
                model.outstanding_amount,
                &model.payment_status,
            )?,
        })
    }
}

/// Builds an insertable sale row.
pub fn sale_active(sale: &Sale) -> sales::ActiveModel {
    sales::ActiveModel {
        id: Set(sale.id.into_inner()),
        code: Set(sale.code.clone()),
        customer_id: Set(sale.customer_id.into_inner()),
        invoice_date: Set(sale.invoice_date),
        status: Set(sale.status.as_str().to_string()),
        payment_method: Set(sale.payment_method.as_str().to_string()),
        cash_bank_id: Set(sale.cash_bank_id.map(|id| id.into_inner())),
        subtotal: Set(sale.subtotal),
        tax_amount: Set(sale.tax_amount),
        total_amount: Set(sale.total_amount),
        paid_amount: Set(sale.settlement.paid_amount),
        outstanding_amount: Set(sale.settlement.outstanding_amount),
        payment_status: Set(sale.settlement.status.as_str().to_string()),
    }
}

impl TryFrom<purchases::Model> for Purchase {
    type Error = StoreError;

    fn try_from(model: purchases::Model) -> StoreResult<Self> {
        Ok(Self {
            id: model.id.into(),
            code: model.code,
            vendor_id: model.vendor_id.into(),
            bill_date: model.bill_date,
            status: parse::<PurchaseStatus>(&model.status)?,
            payment_method: PaymentMethod::from_code(&model.payment_method),
            cash_bank_id: model.cash_bank_id.map(Into::into),
            subtotal: model.subtotal,
            tax_amount: model.tax_amount,
            pph21_amount: model.pph21_amount,
            pph23_amount: model.pph23_amount,
            total_amount: model.total_amount,
            settlement: settlement(
                model.paid_amount,
                model.outstanding_amount,
                &model.payment_status,
            )?,
        })
    }
}

/// Builds an insertable purchase row.
pub fn purchase_active(purchase: &Purchase) -> purchases::ActiveModel {
    purchases::ActiveModel {
        id: Set(purchase.id.into_inner()),
        code: Set(purchase.code.clone()),
        vendor_id: Set(purchase.vendor_id.into_inner()),
        bill_date: Set(purchase.bill_date),
        status: Set(purchase.status.as_str().to_string()),
        payment_method: Set(purchase.payment_method.as_str().to_string()),
        cash_bank_id: Set(purchase.cash_bank_id.map(|id| id.into_inner())),
        subtotal: Set(purchase.subtotal),
        tax_amount: Set(purchase.tax_amount),
        pph21_amount: Set(purchase.pph21_amount),
        pph23_amount: Set(purchase.pph23_amount),
        total_amount: Set(purchase.total_amount),
        paid_amount: Set(purchase.settlement.paid_amount),
        outstanding_amount: Set(purchase.settlement.outstanding_amount),
        payment_status: Set(purchase.settlement.status.as_str().to_string()),
    }
}

// ========== Payments ==========

impl TryFrom<payments::Model> for Payment {
    type Error = StoreError;

    fn try_from(model: payments::Model) -> StoreResult<Self> {
        Ok(Self {
            id: model.id.into(),
            code: model.code,
            contact_id: model.contact_id.into(),
            role: parse::<CounterpartyRole>(&model.role)?,
            payment_date: model.payment_date,
            amount: model.amount,
            method: PaymentMethod::from_code(&model.method),
            cash_bank_id: model.cash_bank_id.into(),
            status: parse::<PaymentStatus>(&model.status)?,
            journal_entry_id: model.journal_entry_id.map(Into::into),
            notes: model.notes,
            created_by: model.created_by.map(Into::into),
        })
    }
}

/// Builds an insertable payment row.
pub fn payment_active(payment: &Payment) -> payments::ActiveModel {
    payments::ActiveModel {
        id: Set(payment.id.into_inner()),
        code: Set(payment.code.clone()),
        contact_id: Set(payment.contact_id.into_inner()),
        role: Set(payment.role.as_str().to_string()),
        payment_date: Set(payment.payment_date),
        amount: Set(payment.amount),
        method: Set(payment.method.as_str().to_string()),
        cash_bank_id: Set(payment.cash_bank_id.into_inner()),
        status: Set(payment.status.as_str().to_string()),
        journal_entry_id: Set(payment.journal_entry_id.map(|id| id.into_inner())),
        notes: Set(payment.notes.clone()),
        created_by: Set(payment.created_by.map(|id| id.into_inner())),
        created_at: Set(fixed(Utc::now())),
    }
}

impl TryFrom<payment_allocations::Model> for PaymentAllocation {
    type Error = StoreError;

    fn try_from(model: payment_allocations::Model) -> StoreResult<Self> {
        let target = match (model.sale_id, model.purchase_id) {
            (Some(sale), None) => AllocationTarget::Sale(sale.into()),
            (None, Some(purchase)) => AllocationTarget::Purchase(purchase.into()),
            _ => {
                return Err(StoreError::Backend(format!(
                    "payment allocation {} must reference exactly one document",
                    model.id
                )));
            }
        };
        Ok(Self {
            id: model.id.into(),
            payment_id: model.payment_id.into(),
            target,
            amount: model.amount,
        })
    }
}

/// Builds an insertable allocation row.
pub fn allocation_active(allocation: &PaymentAllocation) -> payment_allocations::ActiveModel {
    let (sale_id, purchase_id) = match allocation.target {
        AllocationTarget::Sale(id) => (Some(id.into_inner()), None),
        AllocationTarget::Purchase(id) => (None, Some(id.into_inner())),
    };
    payment_allocations::ActiveModel {
        id: Set(allocation.id.into_inner()),
        payment_id: Set(allocation.payment_id.into_inner()),
        sale_id: Set(sale_id),
        purchase_id: Set(purchase_id),
        amount: Set(allocation.amount),
        created_at: Set(fixed(Utc::now())),
    }
}

// ========== Accounting periods ==========

impl TryFrom<accounting_periods::Model> for AccountingPeriod {
    type Error = StoreError;

    fn try_from(model: accounting_periods::Model) -> StoreResult<Self> {
        Ok(Self {
            id: model.id.into(),
            kind: parse::<PeriodKind>(&model.kind)?,
            start_date: model.start_date,
            end_date: model.end_date,
            total_revenue: model.total_revenue,
            total_expense: model.total_expense,
            net_income: model.net_income,
            closing_entry_id: model.closing_entry_id.map(Into::into),
            is_closed: model.is_closed,
            is_locked: model.is_locked,
            closed_by: model.closed_by.map(Into::into),
            closed_at: model.closed_at.map(utc),
            notes: model.notes,
        })
    }
}

/// Builds a fully-set period row, usable for insert and update.
pub fn period_active(period: &AccountingPeriod) -> accounting_periods::ActiveModel {
    accounting_periods::ActiveModel {
        id: Set(period.id.into_inner()),
        kind: Set(period.kind.as_str().to_string()),
        start_date: Set(period.start_date),
        end_date: Set(period.end_date),
        total_revenue: Set(period.total_revenue),
        total_expense: Set(period.total_expense),
        net_income: Set(period.net_income),
        closing_entry_id: Set(period.closing_entry_id.map(|id| id.into_inner())),
        is_closed: Set(period.is_closed),
        is_locked: Set(period.is_locked),
        closed_by: Set(period.closed_by.map(|id| id.into_inner())),
        closed_at: Set(period.closed_at.map(fixed)),
        notes: Set(period.notes.clone()),
    }
}
