//! Property tests for closing lines.

use proptest::prelude::*;
use rust_decimal::Decimal;

use neraca_shared::types::AccountId;

use super::lines::closing_lines;
use super::preview::ClosingAccount;
use crate::ledger::types::AccountType;

fn balance() -> impl Strategy<Value = Decimal> {
    (-1_000_000_000_i64..=1_000_000_000_i64)
        .prop_filter("non-zero", |c| *c != 0)
        .prop_map(|c| Decimal::new(c, 2))
}

fn accounts(prefix: &'static str) -> impl Strategy<Value = Vec<ClosingAccount>> {
    prop::collection::vec(balance(), 0..6).prop_map(move |balances| {
        balances
            .into_iter()
            .enumerate()
            .map(|(i, balance)| ClosingAccount {
                id: AccountId::new(),
                code: format!("{prefix}{i:02}"),
                name: format!("{prefix}{i:02}"),
                balance,
            })
            .collect()
    })
}

/// Net balance change the lines cause on one account.
fn effect(lines: &[crate::ledger::types::LineInput], id: AccountId, kind: AccountType) -> Decimal {
    lines
        .iter()
        .filter(|l| l.account_id == id)
        .map(|l| kind.balance_change(l.debit, l.credit))
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_closing_lines_balance(revenue in accounts("41"), expense in accounts("51")) {
        let lines = closing_lines(AccountId::new(), &revenue, &expense);
        let debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let credit: Decimal = lines.iter().map(|l| l.credit).sum();
        prop_assert_eq!(debit, credit);
        for line in &lines {
            prop_assert!(line.debit >= Decimal::ZERO && line.credit >= Decimal::ZERO);
            prop_assert!(line.debit.is_zero() != line.credit.is_zero());
        }
    }

    #[test]
    fn prop_temporary_accounts_end_at_zero(revenue in accounts("41"), expense in accounts("51")) {
        let lines = closing_lines(AccountId::new(), &revenue, &expense);
        for account in &revenue {
            prop_assert_eq!(account.balance + effect(&lines, account.id, AccountType::Revenue), Decimal::ZERO);
        }
        for account in &expense {
            prop_assert_eq!(account.balance + effect(&lines, account.id, AccountType::Expense), Decimal::ZERO);
        }
    }

    #[test]
    fn prop_retained_earnings_moves_by_net_income(revenue in accounts("41"), expense in accounts("51")) {
        let re = AccountId::new();
        let lines = closing_lines(re, &revenue, &expense);
        let total_revenue: Decimal = revenue.iter().map(|a| a.balance).sum();
        let total_expense: Decimal = expense.iter().map(|a| a.balance).sum();
        prop_assert_eq!(effect(&lines, re, AccountType::Equity), total_revenue - total_expense);
    }
}
