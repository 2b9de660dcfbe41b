//! Initial database migration.
//!
//! Creates the ledger tables, their check constraints, and the partial unique
//! index that backs the duplicate-posting guard.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 2: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;

        // ============================================================
        // PART 3: CASH & BANK
        // ============================================================
        db.execute_unprepared(CASH_BANKS_SQL).await?;
        db.execute_unprepared(CASH_BANK_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: SALES, PURCHASES & PAYMENTS
        // ============================================================
        db.execute_unprepared(SALES_SQL).await?;
        db.execute_unprepared(PURCHASES_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(PAYMENT_ALLOCATIONS_SQL).await?;

        // ============================================================
        // PART 5: PERIOD CLOSING
        // ============================================================
        db.execute_unprepared(ACCOUNTING_PERIODS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    code VARCHAR(20) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    account_type VARCHAR(20) NOT NULL
        CHECK (account_type IN ('ASSET', 'LIABILITY', 'EQUITY', 'REVENUE', 'EXPENSE')),
    parent_id UUID REFERENCES accounts(id),
    balance NUMERIC(20, 4) NOT NULL DEFAULT 0,
    is_header BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE INDEX idx_accounts_type ON accounts(account_type);
CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    code VARCHAR(100) NOT NULL UNIQUE,
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    source_type VARCHAR(30),
    source_id UUID,
    status VARCHAR(20) NOT NULL CHECK (status IN ('DRAFT', 'POSTED', 'REVERSED')),
    total_debit NUMERIC(20, 4) NOT NULL,
    total_credit NUMERIC(20, 4) NOT NULL,
    is_balanced BOOLEAN NOT NULL,
    reversal_of UUID REFERENCES journal_entries(id),
    reversed_by UUID REFERENCES journal_entries(id),
    created_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK ((source_type IS NULL) = (source_id IS NULL))
);

CREATE INDEX idx_journal_entries_date ON journal_entries(entry_date);
CREATE INDEX idx_journal_entries_source ON journal_entries(source_type, source_id)
    WHERE source_type IS NOT NULL;

-- Second line of defence behind the in-transaction duplicate guard
CREATE UNIQUE INDEX uq_journal_entries_posted_source ON journal_entries(source_type, source_id)
    WHERE status = 'POSTED' AND source_type IS NOT NULL;
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    line_number INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    debit NUMERIC(20, 4) NOT NULL DEFAULT 0 CHECK (debit >= 0),
    credit NUMERIC(20, 4) NOT NULL DEFAULT 0 CHECK (credit >= 0),
    CHECK ((debit = 0) <> (credit = 0)),
    UNIQUE (entry_id, line_number)
);

CREATE INDEX idx_journal_lines_account ON journal_lines(account_id);
";

const CASH_BANKS_SQL: &str = r"
CREATE TABLE cash_banks (
    id UUID PRIMARY KEY,
    code VARCHAR(20) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    account_id UUID REFERENCES accounts(id),
    balance NUMERIC(20, 4) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true
);

-- One account backs at most one active register
CREATE UNIQUE INDEX uq_cash_banks_account ON cash_banks(account_id)
    WHERE account_id IS NOT NULL AND is_active = true;
";

const CASH_BANK_TRANSACTIONS_SQL: &str = r"
CREATE TABLE cash_bank_transactions (
    id UUID PRIMARY KEY,
    cash_bank_id UUID NOT NULL REFERENCES cash_banks(id),
    amount NUMERIC(20, 4) NOT NULL CHECK (amount <> 0),
    balance_after NUMERIC(20, 4) NOT NULL,
    reference_type VARCHAR(30) NOT NULL,
    reference_id UUID,
    transaction_date DATE NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_cash_bank_transactions_live ON cash_bank_transactions(cash_bank_id)
    WHERE deleted_at IS NULL;
";

const SALES_SQL: &str = r"
CREATE TABLE sales (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL UNIQUE,
    customer_id UUID NOT NULL,
    invoice_date DATE NOT NULL,
    status VARCHAR(20) NOT NULL,
    payment_method VARCHAR(20) NOT NULL,
    cash_bank_id UUID REFERENCES cash_banks(id),
    subtotal NUMERIC(20, 4) NOT NULL,
    tax_amount NUMERIC(20, 4) NOT NULL DEFAULT 0,
    total_amount NUMERIC(20, 4) NOT NULL,
    paid_amount NUMERIC(20, 4) NOT NULL DEFAULT 0,
    outstanding_amount NUMERIC(20, 4) NOT NULL CHECK (outstanding_amount >= 0),
    payment_status VARCHAR(20) NOT NULL DEFAULT 'UNPAID'
);

CREATE INDEX idx_sales_customer ON sales(customer_id) WHERE outstanding_amount > 0;
";

const PURCHASES_SQL: &str = r"
CREATE TABLE purchases (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL UNIQUE,
    vendor_id UUID NOT NULL,
    bill_date DATE NOT NULL,
    status VARCHAR(20) NOT NULL,
    payment_method VARCHAR(20) NOT NULL,
    cash_bank_id UUID REFERENCES cash_banks(id),
    subtotal NUMERIC(20, 4) NOT NULL,
    tax_amount NUMERIC(20, 4) NOT NULL DEFAULT 0,
    pph21_amount NUMERIC(20, 4) NOT NULL DEFAULT 0,
    pph23_amount NUMERIC(20, 4) NOT NULL DEFAULT 0,
    total_amount NUMERIC(20, 4) NOT NULL,
    paid_amount NUMERIC(20, 4) NOT NULL DEFAULT 0,
    outstanding_amount NUMERIC(20, 4) NOT NULL CHECK (outstanding_amount >= 0),
    payment_status VARCHAR(20) NOT NULL DEFAULT 'UNPAID'
);

CREATE INDEX idx_purchases_vendor ON purchases(vendor_id) WHERE outstanding_amount > 0;
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL UNIQUE,
    contact_id UUID NOT NULL,
    role VARCHAR(20) NOT NULL CHECK (role IN ('RECEIVABLE', 'PAYABLE')),
    payment_date DATE NOT NULL,
    amount NUMERIC(20, 4) NOT NULL CHECK (amount > 0),
    method VARCHAR(20) NOT NULL,
    cash_bank_id UUID NOT NULL REFERENCES cash_banks(id),
    status VARCHAR(20) NOT NULL CHECK (status IN ('PENDING', 'COMPLETED', 'FAILED')),
    journal_entry_id UUID REFERENCES journal_entries(id),
    notes TEXT NOT NULL DEFAULT '',
    created_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PAYMENT_ALLOCATIONS_SQL: &str = r"
CREATE TABLE payment_allocations (
    id UUID PRIMARY KEY,
    payment_id UUID NOT NULL REFERENCES payments(id) ON DELETE CASCADE,
    sale_id UUID REFERENCES sales(id),
    purchase_id UUID REFERENCES purchases(id),
    amount NUMERIC(20, 4) NOT NULL CHECK (amount > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK ((sale_id IS NULL) <> (purchase_id IS NULL))
);

CREATE INDEX idx_payment_allocations_payment ON payment_allocations(payment_id);
";

const ACCOUNTING_PERIODS_SQL: &str = r"
CREATE TABLE accounting_periods (
    id UUID PRIMARY KEY,
    kind VARCHAR(20) NOT NULL CHECK (kind IN ('PERIOD', 'FISCAL_YEAR')),
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    total_revenue NUMERIC(20, 4) NOT NULL DEFAULT 0,
    total_expense NUMERIC(20, 4) NOT NULL DEFAULT 0,
    net_income NUMERIC(20, 4) NOT NULL DEFAULT 0,
    closing_entry_id UUID REFERENCES journal_entries(id),
    is_closed BOOLEAN NOT NULL DEFAULT true,
    is_locked BOOLEAN NOT NULL DEFAULT false,
    closed_by UUID,
    closed_at TIMESTAMPTZ,
    notes TEXT NOT NULL DEFAULT '',
    CHECK (end_date >= start_date),
    UNIQUE (start_date, end_date)
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS accounting_periods CASCADE;
DROP TABLE IF EXISTS payment_allocations CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS purchases CASCADE;
DROP TABLE IF EXISTS sales CASCADE;
DROP TABLE IF EXISTS cash_bank_transactions CASCADE;
DROP TABLE IF EXISTS cash_banks CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
";
