//! Closing journal lines.

use rust_decimal::Decimal;

use neraca_shared::types::AccountId;

use super::preview::ClosingAccount;
use crate::ledger::types::LineInput;

/// Builds the lines that zero every temporary account into retained earnings.
///
/// Order: revenue debits, retained earnings credit for total revenue,
/// retained earnings debit for total expense, expense credits. A negative
/// balance posts on the opposite side so the entry stays balanced.
#[must_use]
pub fn closing_lines(
    retained_earnings: AccountId,
    revenue: &[ClosingAccount],
    expense: &[ClosingAccount],
) -> Vec<LineInput> {
    let mut lines = Vec::with_capacity(revenue.len() + expense.len() + 2);

    for account in revenue {
        lines.push(zeroing_line(account, true));
    }
    let total_revenue: Decimal = revenue.iter().map(|a| a.balance).sum();
    if let Some(line) = retained_line(retained_earnings, total_revenue, false, "Revenue") {
        lines.push(line);
    }

    let total_expense: Decimal = expense.iter().map(|a| a.balance).sum();
    if let Some(line) = retained_line(retained_earnings, total_expense, true, "Expense") {
        lines.push(line);
    }
    for account in expense {
        lines.push(zeroing_line(account, false));
    }

    lines
}

/// Debit-normal closing of a credit-normal account, or the reverse.
fn zeroing_line(account: &ClosingAccount, debit_side: bool) -> LineInput {
    let description = format!("Close {} - {}", account.code, account.name);
    let amount = account.balance.abs();
    if debit_side == account.balance.is_sign_positive() {
        LineInput::debit(account.id, amount, description)
    } else {
        LineInput::credit(account.id, amount, description)
    }
}

fn retained_line(
    account: AccountId,
    total: Decimal,
    debit_side: bool,
    label: &str,
) -> Option<LineInput> {
    if total.is_zero() {
        return None;
    }
    let description = format!("{label} to retained earnings");
    let amount = total.abs();
    Some(if debit_side == total.is_sign_positive() {
        LineInput::debit(account, amount, description)
    } else {
        LineInput::credit(account, amount, description)
    })
}
