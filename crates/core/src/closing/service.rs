//! Period and fiscal-year closer.
//!
//! A closing posts one entry through the posting pipeline that zeroes every
//! non-zero revenue and expense account into retained earnings, then records
//! an [`AccountingPeriod`]. Reopening posts the reversal of that entry; the
//! original is never edited.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Days, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use neraca_shared::config::LedgerConfig;
use neraca_shared::types::{AccountingPeriodId, UserId};

use super::error::{ClosingError, ClosingResult};
use super::lines::closing_lines;
use super::period::{AccountingPeriod, PeriodKind};
use super::preview::{
    ClosingAccount, ClosingBlocker, ClosingPreview, ClosingWarning, LastClosingInfo,
};
use crate::ledger::PostingService;
use crate::ledger::types::{
    Account, AccountType, EntryStatus, PostingRequest, ReversalRequest, SourceRef, SourceType,
};
use crate::store::{LedgerStore, UnitOfWork};

/// Closes, reopens, and locks accounting periods.
#[derive(Debug)]
pub struct PeriodCloser<S> {
    store: Arc<S>,
    posting: PostingService,
    retained_earnings_code: String,
    lock_on_close: bool,
}

impl<S: LedgerStore> PeriodCloser<S> {
    /// Creates a closer using the retained earnings code and lock policy from `config`.
    #[must_use]
    pub fn new(store: Arc<S>, posting: PostingService, config: &LedgerConfig) -> Self {
        Self {
            store,
            posting,
            retained_earnings_code: config.retained_earnings_code.clone(),
            lock_on_close: config.lock_on_close,
        }
    }

    /// Checks whether `[start, end]` can be closed without writing anything.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    #[instrument(skip(self))]
    pub async fn preview_close_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClosingResult<ClosingPreview> {
        let mut uow = self.store.begin().await?;
        self.preview_in(&mut uow, PeriodKind::Period, start, end).await
    }

    /// Closes `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns `MissingUser`, `InvalidRange`, `CannotClose` with every
    /// blocker the preview found, or a posting/storage error.
    #[instrument(skip(self, notes))]
    pub async fn close_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        notes: &str,
        user: Option<UserId>,
    ) -> ClosingResult<AccountingPeriod> {
        let code = format!("CLO-{}-{}", start.format("%Y-%m"), end.format("%m-%d"));
        self.close_range(PeriodKind::Period, start, end, code, notes, user)
            .await
    }

    /// Previews the fiscal year ending on `fiscal_year_end`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` if the start date is not representable, or a
    /// storage error.
    #[instrument(skip(self))]
    pub async fn preview_fiscal_year_closing(
        &self,
        fiscal_year_end: NaiveDate,
    ) -> ClosingResult<ClosingPreview> {
        let start = fiscal_year_start(fiscal_year_end)?;
        let mut uow = self.store.begin().await?;
        self.preview_in(&mut uow, PeriodKind::FiscalYear, start, fiscal_year_end)
            .await
    }

    /// Closes the fiscal year `[end - 1 year + 1 day, end]`.
    ///
    /// # Errors
    ///
    /// See [`Self::close_period`].
    #[instrument(skip(self, notes))]
    pub async fn close_fiscal_year(
        &self,
        fiscal_year_end: NaiveDate,
        notes: &str,
        user: Option<UserId>,
    ) -> ClosingResult<AccountingPeriod> {
        let start = fiscal_year_start(fiscal_year_end)?;
        let code = format!("CLO-{}", fiscal_year_end.format("%Y-%m-%d"));
        self.close_range(
            PeriodKind::FiscalYear,
            start,
            fiscal_year_end,
            code,
            notes,
            user,
        )
        .await
    }

    /// Reopens the closed period with exactly these dates by reversing its
    /// closing entry.
    ///
    /// # Errors
    ///
    /// Returns `MissingUser`, `PeriodNotFound`, `PeriodLocked`,
    /// `LaterPeriodClosed`, or a posting/storage error.
    #[instrument(skip(self, reason))]
    pub async fn reopen_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        reason: &str,
        user: Option<UserId>,
    ) -> ClosingResult<AccountingPeriod> {
        let user = user.ok_or(ClosingError::MissingUser)?;
        let started = Instant::now();
        let mut uow = self.store.begin().await?;

        let periods = uow.accounting_periods().await?;
        let mut period = find_closed(&periods, start, end)?;
        if period.is_locked {
            return Err(ClosingError::PeriodLocked { start, end });
        }
        if let Some(later) = periods
            .iter()
            .filter(|p| p.is_closed && p.start_date > period.end_date)
            .min_by_key(|p| p.start_date)
        {
            return Err(ClosingError::LaterPeriodClosed {
                later_start: later.start_date,
            });
        }

        if let Some(entry_id) = period.closing_entry_id {
            let reversal = self
                .posting
                .reverse(
                    &mut uow,
                    ReversalRequest {
                        entry_id,
                        entry_date: period.end_date,
                        reason: reason.to_string(),
                        created_by: Some(user),
                    },
                )
                .await?;
            info!(reversal = %reversal.code, "closing entry reversed");
        }

        period.is_closed = false;
        period.closed_by = None;
        period.closed_at = None;
        period.notes.push_str(&format!(
            "\n[REOPENED {} by {user}]: {reason}",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ));
        uow.update_period(&period).await?;
        uow.commit().await?;

        self.posting
            .metrics()
            .record_timing("closing.reopen", started.elapsed());
        info!(%start, %end, "period reopened");
        Ok(period)
    }

    /// Locks the closed period with exactly these dates so it can never be
    /// reopened. Locking an already locked period is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound` or a storage error.
    #[instrument(skip(self))]
    pub async fn lock_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClosingResult<AccountingPeriod> {
        let mut uow = self.store.begin().await?;
        let periods = uow.accounting_periods().await?;
        let mut period = find_closed(&periods, start, end)?;
        if period.is_locked {
            return Ok(period);
        }
        period.is_locked = true;
        uow.update_period(&period).await?;
        uow.commit().await?;
        info!(%start, %end, "period locked");
        Ok(period)
    }

    /// Returns the end of the most recent closed period and the day after it.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn last_closing_info(&self) -> ClosingResult<Option<LastClosingInfo>> {
        let mut uow = self.store.begin().await?;
        let periods = uow.accounting_periods().await?;
        Ok(last_closed_end(&periods).and_then(|last| {
            last.checked_add_days(Days::new(1))
                .map(|next| LastClosingInfo {
                    last_closing_date: last,
                    next_start_date: next,
                })
        }))
    }

    /// Returns true if `date` falls inside a closed period.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn is_date_in_closed_period(&self, date: NaiveDate) -> ClosingResult<bool> {
        let mut uow = self.store.begin().await?;
        Ok(uow
            .accounting_periods()
            .await?
            .iter()
            .any(|p| p.is_closed && p.contains_date(date)))
    }

    /// Lists periods, newest first, including reopened ones.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn closing_history(&self, limit: usize) -> ClosingResult<Vec<AccountingPeriod>> {
        let mut uow = self.store.begin().await?;
        let mut periods = uow.accounting_periods().await?;
        periods.sort_by(|a, b| b.end_date.cmp(&a.end_date));
        periods.truncate(limit);
        Ok(periods)
    }

    async fn close_range(
        &self,
        kind: PeriodKind,
        start: NaiveDate,
        end: NaiveDate,
        code: String,
        notes: &str,
        user: Option<UserId>,
    ) -> ClosingResult<AccountingPeriod> {
        let user = user.ok_or(ClosingError::MissingUser)?;
        if end < start {
            return Err(ClosingError::InvalidRange { start, end });
        }
        let started = Instant::now();
        let mut uow = self.store.begin().await?;

        let preview = self.preview_in(&mut uow, kind, start, end).await?;
        if !preview.can_close() {
            warn!(%start, %end, blockers = preview.blockers.len(), "period cannot be closed");
            return Err(ClosingError::CannotClose(preview.blockers));
        }
        for warning in &preview.warnings {
            warn!(?warning, "closing with warning");
        }

        let reopened = uow
            .accounting_periods()
            .await?
            .into_iter()
            .find(|p| !p.is_closed && p.start_date == start && p.end_date == end);
        let period_id = reopened
            .as_ref()
            .map_or_else(AccountingPeriodId::new, |p| p.id);

        let closing_entry_id = match (&preview.retained_earnings, preview.has_balances()) {
            (Some(retained), true) => {
                let entry = self
                    .posting
                    .post(
                        &mut uow,
                        PostingRequest {
                            code,
                            entry_date: end,
                            description: format!("Closing entry for {start} to {end}"),
                            source: Some(SourceRef::new(SourceType::Closing, period_id)),
                            lines: closing_lines(
                                retained.id,
                                &preview.revenue_accounts,
                                &preview.expense_accounts,
                            ),
                            created_by: Some(user),
                        },
                    )
                    .await?;
                Some(entry.id)
            }
            _ => {
                info!(%start, %end, "no temporary balances, closing without an entry");
                None
            }
        };

        let period = AccountingPeriod {
            id: period_id,
            kind,
            start_date: start,
            end_date: end,
            total_revenue: preview.total_revenue,
            total_expense: preview.total_expense,
            net_income: preview.net_income,
            closing_entry_id,
            is_closed: true,
            is_locked: self.lock_on_close,
            closed_by: Some(user),
            closed_at: Some(Utc::now()),
            notes: match &reopened {
                Some(previous) if notes.is_empty() => previous.notes.clone(),
                Some(previous) => format!("{}\n{notes}", previous.notes),
                None => notes.to_string(),
            },
        };
        if reopened.is_some() {
            uow.update_period(&period).await?;
        } else {
            uow.insert_period(&period).await?;
        }
        uow.commit().await?;

        self.posting
            .metrics()
            .record_timing("closing.close", started.elapsed());
        info!(
            kind = kind.as_str(),
            %start,
            %end,
            net_income = %period.net_income,
            "period closed"
        );
        Ok(period)
    }

    async fn preview_in<U: UnitOfWork>(
        &self,
        uow: &mut U,
        kind: PeriodKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClosingResult<ClosingPreview> {
        let mut preview = ClosingPreview::empty(kind, start, end);
        if end < start {
            preview.blockers.push(ClosingBlocker::InvalidRange);
            return Ok(preview);
        }
        let epsilon = self.posting.epsilon();

        let periods = uow.accounting_periods().await?;
        let overlapping = periods
            .iter()
            .filter(|p| p.is_closed && p.overlaps(start, end))
            .count();
        if overlapping > 0 {
            preview
                .blockers
                .push(ClosingBlocker::OverlapsClosedPeriod { count: overlapping });
        }
        preview.last_closing_date = last_closed_end(&periods);
        if let Some(expected_start) = preview
            .last_closing_date
            .and_then(|last| last.checked_add_days(Days::new(1)))
        {
            if start != expected_start {
                preview
                    .warnings
                    .push(ClosingWarning::Discontinuous { expected_start });
            }
        }

        let code = self.retained_earnings_code.clone();
        match uow.account_by_code(&code).await? {
            None => preview
                .blockers
                .push(ClosingBlocker::RetainedEarningsMissing { code }),
            Some(account) if account.account_type != AccountType::Equity => {
                preview.blockers.push(ClosingBlocker::RetainedEarningsNotEquity {
                    code,
                    actual: account.account_type,
                });
            }
            Some(account) if !account.is_active || account.is_header => preview
                .blockers
                .push(ClosingBlocker::RetainedEarningsNotPostable { code }),
            Some(account) => preview.retained_earnings = Some(ClosingAccount::from(&account)),
        }

        let entries = uow.entries_between(start, end).await?;
        preview.transaction_count = entries
            .iter()
            .filter(|e| e.status == EntryStatus::Posted)
            .count();
        let unbalanced = entries.iter().filter(|e| !e.is_balanced).count();
        if unbalanced > 0 {
            preview
                .blockers
                .push(ClosingBlocker::UnbalancedEntries { count: unbalanced });
        }
        let drafts = entries
            .iter()
            .filter(|e| e.status == EntryStatus::Draft)
            .count();
        if drafts > 0 {
            preview
                .blockers
                .push(ClosingBlocker::DraftEntries { count: drafts });
        }

        let (revenue, expense): (Vec<Account>, Vec<Account>) = temporary_accounts(uow, epsilon)
            .await?
            .into_iter()
            .partition(|a| a.account_type == AccountType::Revenue);
        preview.revenue_accounts = revenue.iter().map(ClosingAccount::from).collect();
        preview.expense_accounts = expense.iter().map(ClosingAccount::from).collect();
        preview.total_revenue = preview.revenue_accounts.iter().map(|a| a.balance).sum();
        preview.total_expense = preview.expense_accounts.iter().map(|a| a.balance).sum();
        preview.net_income = preview.total_revenue - preview.total_expense;

        if preview.transaction_count == 0 {
            preview.warnings.push(ClosingWarning::NoTransactions);
            if preview.has_balances() {
                preview
                    .warnings
                    .push(ClosingWarning::BalancesFromOutsidePeriod);
            }
        }

        Ok(preview)
    }
}

/// Non-header, active revenue and expense accounts whose balance exceeds
/// `epsilon`. Rows stay locked until the unit of work ends.
async fn temporary_accounts<U: UnitOfWork>(
    uow: &mut U,
    epsilon: Decimal,
) -> ClosingResult<Vec<Account>> {
    let mut accounts = Vec::new();
    for account_type in AccountType::ALL.into_iter().filter(|t| t.is_temporary()) {
        accounts.extend(
            uow.accounts_of_type(account_type)
                .await?
                .into_iter()
                .filter(|a| a.is_active && !a.is_header && a.balance.abs() > epsilon),
        );
    }
    Ok(accounts)
}

fn fiscal_year_start(end: NaiveDate) -> ClosingResult<NaiveDate> {
    end.checked_sub_months(Months::new(12))
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .ok_or(ClosingError::InvalidRange { start: end, end })
}

fn last_closed_end(periods: &[AccountingPeriod]) -> Option<NaiveDate> {
    periods
        .iter()
        .filter(|p| p.is_closed)
        .map(|p| p.end_date)
        .max()
}

fn find_closed(
    periods: &[AccountingPeriod],
    start: NaiveDate,
    end: NaiveDate,
) -> ClosingResult<AccountingPeriod> {
    periods
        .iter()
        .find(|p| p.is_closed && p.start_date == start && p.end_date == end)
        .cloned()
        .ok_or(ClosingError::PeriodNotFound { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::ledger::types::{JournalEntry, LineInput};
    use crate::observability::testing::RecordingMetrics;
    use crate::testing::{Chart, date, posting_service, shared, standard_chart};
    use crate::store::MemoryStore;
    use neraca_shared::types::JournalEntryId;
    use rust_decimal_macros::dec;

    fn closer(store: &MemoryStore) -> PeriodCloser<MemoryStore> {
        PeriodCloser::new(shared(store), posting_service(), &LedgerConfig::default())
    }

    async fn post(store: &MemoryStore, code: &str, day: NaiveDate, lines: Vec<LineInput>) {
        Ledger::new(shared(store), posting_service())
            .post(PostingRequest {
                code: code.into(),
                entry_date: day,
                description: code.into(),
                source: None,
                lines,
                created_by: None,
            })
            .await
            .unwrap();
    }

    /// Revenue 1,000,000 and expense 400,000 in January 2026.
    async fn january(store: &MemoryStore, chart: &Chart) {
        post(
            store,
            "JV-001",
            date(2026, 1, 10),
            vec![
                LineInput::debit(chart.id("1101"), dec!(1000000), "Cash"),
                LineInput::credit(chart.id("4101"), dec!(1000000), "Sales"),
            ],
        )
        .await;
        post(
            store,
            "JV-002",
            date(2026, 1, 25),
            vec![
                LineInput::debit(chart.id("5201"), dec!(400000), "Salaries"),
                LineInput::credit(chart.id("1101"), dec!(400000), "Cash"),
            ],
        )
        .await;
    }

    async fn balance(store: &MemoryStore, chart: &Chart, code: &str) -> Decimal {
        store.snapshot().await.accounts[&chart.id(code)].balance
    }

    fn user() -> Option<UserId> {
        Some(UserId::new())
    }

    #[tokio::test]
    async fn test_close_rolls_net_income_into_retained_earnings() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;

        let period = closer(&store)
            .close_period(date(2026, 1, 1), date(2026, 1, 31), "January", user())
            .await
            .unwrap();

        assert_eq!(period.total_revenue, dec!(1000000));
        assert_eq!(period.total_expense, dec!(400000));
        assert_eq!(period.net_income, dec!(600000));
        assert!(period.is_closed);
        assert!(!period.is_locked);
        assert_eq!(balance(&store, &chart, "3201").await, dec!(600000));
        assert_eq!(balance(&store, &chart, "3000").await, dec!(600000));
        assert_eq!(balance(&store, &chart, "4101").await, Decimal::ZERO);
        assert_eq!(balance(&store, &chart, "4000").await, Decimal::ZERO);
        assert_eq!(balance(&store, &chart, "5201").await, Decimal::ZERO);

        let state = store.snapshot().await;
        let entry = &state.entries[&period.closing_entry_id.unwrap()];
        assert_eq!(entry.code, "CLO-2026-01-01-31");
        assert_eq!(entry.entry_date, date(2026, 1, 31));
        assert_eq!(entry.source, Some(SourceRef::new(SourceType::Closing, period.id)));
        assert_eq!(state.lines[&entry.id].len(), 4);
    }

    #[tokio::test]
    async fn test_reopen_restores_pre_closing_balances() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let closer = closer(&store);
        let (start, end) = (date(2026, 1, 1), date(2026, 1, 31));
        let closed = closer.close_period(start, end, "", user()).await.unwrap();

        let reopened = closer
            .reopen_period(start, end, "late invoice", user())
            .await
            .unwrap();

        assert!(!reopened.is_closed);
        assert!(reopened.closed_by.is_none());
        assert!(reopened.closed_at.is_none());
        assert!(reopened.notes.contains("]: late invoice"));
        assert_eq!(balance(&store, &chart, "4101").await, dec!(1000000));
        assert_eq!(balance(&store, &chart, "5201").await, dec!(400000));
        assert_eq!(balance(&store, &chart, "3201").await, Decimal::ZERO);

        assert!(closed.closed_by.is_some());
        let state = store.snapshot().await;
        assert_eq!(state.periods, vec![reopened.clone()]);
        let original = &state.entries[&closed.closing_entry_id.unwrap()];
        assert_eq!(original.status, EntryStatus::Reversed);
        let reversal = &state.entries[&original.reversed_by.unwrap()];
        assert_eq!(reversal.code, "REV-CLO-2026-01-01-31");
        assert_eq!(reversal.entry_date, end);
        assert!(!closer.is_date_in_closed_period(date(2026, 1, 15)).await.unwrap());
    }

    #[tokio::test]
    async fn test_reclose_after_reopen_reuses_period_row() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let closer = closer(&store);
        let (start, end) = (date(2026, 1, 1), date(2026, 1, 31));
        let first = closer.close_period(start, end, "first", user()).await.unwrap();
        closer.reopen_period(start, end, "fix", user()).await.unwrap();

        let second = closer.close_period(start, end, "second", user()).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_ne!(second.closing_entry_id, first.closing_entry_id);
        assert!(second.notes.starts_with("first"));
        assert!(second.notes.ends_with("second"));
        assert_eq!(store.snapshot().await.periods.len(), 1);
        assert_eq!(balance(&store, &chart, "3201").await, dec!(600000));
    }

    #[tokio::test]
    async fn test_locked_period_cannot_be_reopened() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let closer = closer(&store);
        let (start, end) = (date(2026, 1, 1), date(2026, 1, 31));
        closer.close_period(start, end, "", user()).await.unwrap();
        closer.lock_period(start, end).await.unwrap();

        let err = closer.reopen_period(start, end, "oops", user()).await.unwrap_err();

        assert!(matches!(err, ClosingError::PeriodLocked { .. }));
        assert_eq!(balance(&store, &chart, "3201").await, dec!(600000));
    }

    #[tokio::test]
    async fn test_lock_on_close_policy() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let config = LedgerConfig {
            lock_on_close: true,
            ..LedgerConfig::default()
        };
        let closer = PeriodCloser::new(shared(&store), posting_service(), &config);

        let period = closer
            .close_period(date(2026, 1, 1), date(2026, 1, 31), "", user())
            .await
            .unwrap();

        assert!(period.is_locked);
    }

    #[tokio::test]
    async fn test_overlapping_period_is_blocked() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let closer = closer(&store);
        closer
            .close_period(date(2026, 1, 1), date(2026, 1, 31), "", user())
            .await
            .unwrap();

        let preview = closer
            .preview_close_period(date(2026, 1, 15), date(2026, 2, 15))
            .await
            .unwrap();
        assert!(!preview.can_close());
        assert!(preview
            .blockers
            .contains(&ClosingBlocker::OverlapsClosedPeriod { count: 1 }));

        let err = closer
            .close_period(date(2026, 1, 15), date(2026, 2, 15), "", user())
            .await
            .unwrap_err();
        assert!(matches!(err, ClosingError::CannotClose(_)));
    }

    #[tokio::test]
    async fn test_draft_entry_blocks_closing() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        store
            .insert_raw_entry(
                JournalEntry {
                    id: JournalEntryId::new(),
                    code: "JV-DRAFT".into(),
                    entry_date: date(2026, 1, 20),
                    description: "draft".into(),
                    source: None,
                    status: EntryStatus::Draft,
                    total_debit: dec!(10),
                    total_credit: dec!(10),
                    is_balanced: true,
                    reversal_of: None,
                    reversed_by: None,
                    created_by: None,
                    created_at: Utc::now(),
                },
                Vec::new(),
            )
            .await;

        let err = closer(&store)
            .close_period(date(2026, 1, 1), date(2026, 1, 31), "", user())
            .await
            .unwrap_err();

        match err {
            ClosingError::CannotClose(blockers) => {
                assert_eq!(blockers, vec![ClosingBlocker::DraftEntries { count: 1 }]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(balance(&store, &chart, "4101").await, dec!(1000000));
        assert!(store.snapshot().await.periods.is_empty());
    }

    #[tokio::test]
    async fn test_missing_retained_earnings_blocks_preview() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let config = LedgerConfig {
            retained_earnings_code: "3999".into(),
            ..LedgerConfig::default()
        };
        let closer = PeriodCloser::new(shared(&store), posting_service(), &config);

        let preview = closer
            .preview_close_period(date(2026, 1, 1), date(2026, 1, 31))
            .await
            .unwrap();

        assert_eq!(
            preview.blockers,
            vec![ClosingBlocker::RetainedEarningsMissing { code: "3999".into() }]
        );
        assert_eq!(preview.net_income, dec!(600000));
        assert_eq!(preview.transaction_count, 2);
    }

    #[tokio::test]
    async fn test_non_equity_retained_earnings_blocks_preview() {
        let (store, _) = standard_chart().await;
        let config = LedgerConfig {
            retained_earnings_code: "2101".into(),
            ..LedgerConfig::default()
        };
        let closer = PeriodCloser::new(shared(&store), posting_service(), &config);

        let preview = closer
            .preview_close_period(date(2026, 1, 1), date(2026, 1, 31))
            .await
            .unwrap();

        assert!(preview.blockers.contains(&ClosingBlocker::RetainedEarningsNotEquity {
            code: "2101".into(),
            actual: AccountType::Liability,
        }));
    }

    #[tokio::test]
    async fn test_missing_user_writes_nothing() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;

        let err = closer(&store)
            .close_period(date(2026, 1, 1), date(2026, 1, 31), "", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ClosingError::MissingUser));
        assert!(store.snapshot().await.periods.is_empty());
        assert_eq!(balance(&store, &chart, "3201").await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_discontinuous_start_warns() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let closer = closer(&store);
        closer
            .close_period(date(2026, 1, 1), date(2026, 1, 31), "", user())
            .await
            .unwrap();

        let preview = closer
            .preview_close_period(date(2026, 2, 5), date(2026, 2, 28))
            .await
            .unwrap();

        assert!(preview.can_close());
        assert!(preview.warnings.contains(&ClosingWarning::Discontinuous {
            expected_start: date(2026, 2, 1),
        }));
        assert!(preview.warnings.contains(&ClosingWarning::NoTransactions));
        assert_eq!(
            closer.last_closing_info().await.unwrap(),
            Some(LastClosingInfo {
                last_closing_date: date(2026, 1, 31),
                next_start_date: date(2026, 2, 1),
            })
        );
    }

    #[tokio::test]
    async fn test_later_closed_period_blocks_reopen() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let closer = closer(&store);
        closer
            .close_period(date(2026, 1, 1), date(2026, 1, 31), "", user())
            .await
            .unwrap();
        closer
            .close_period(date(2026, 2, 1), date(2026, 2, 28), "", user())
            .await
            .unwrap();

        let err = closer
            .reopen_period(date(2026, 1, 1), date(2026, 1, 31), "x", user())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClosingError::LaterPeriodClosed { later_start } if later_start == date(2026, 2, 1)
        ));
    }

    #[tokio::test]
    async fn test_nothing_to_close_records_period_without_entry() {
        let (store, _) = standard_chart().await;
        let closer = closer(&store);

        let period = closer
            .close_period(date(2026, 3, 1), date(2026, 3, 31), "", user())
            .await
            .unwrap();

        assert_eq!(period.closing_entry_id, None);
        assert!(store.snapshot().await.entries.is_empty());
        assert!(closer.is_date_in_closed_period(date(2026, 3, 31)).await.unwrap());
        assert!(!closer.is_date_in_closed_period(date(2026, 4, 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_fiscal_year_closing() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let closer = closer(&store);

        let preview = closer
            .preview_fiscal_year_closing(date(2026, 12, 31))
            .await
            .unwrap();
        assert_eq!(preview.start_date, date(2026, 1, 1));
        assert_eq!(preview.kind, PeriodKind::FiscalYear);

        let period = closer
            .close_fiscal_year(date(2026, 12, 31), "FY2026", user())
            .await
            .unwrap();

        assert_eq!(period.kind, PeriodKind::FiscalYear);
        assert_eq!(period.start_date, date(2026, 1, 1));
        let state = store.snapshot().await;
        assert_eq!(state.entries[&period.closing_entry_id.unwrap()].code, "CLO-2026-12-31");
        assert_eq!(balance(&store, &chart, "3201").await, dec!(600000));
        assert_eq!(closer.closing_history(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_close_records_timing() {
        let (store, chart) = standard_chart().await;
        january(&store, &chart).await;
        let metrics = Arc::new(RecordingMetrics::default());
        let posting = PostingService::new(dec!(0.01), metrics.clone());
        let closer = PeriodCloser::new(shared(&store), posting, &LedgerConfig::default());

        closer
            .close_period(date(2026, 1, 1), date(2026, 1, 31), "", user())
            .await
            .unwrap();

        assert!(metrics.timings.lock().unwrap().contains(&"closing.close"));
    }

    #[test]
    fn test_fiscal_year_start_handles_leap_day() {
        assert_eq!(fiscal_year_start(date(2028, 2, 29)).unwrap(), date(2027, 3, 1));
        assert_eq!(fiscal_year_start(date(2026, 6, 30)).unwrap(), date(2025, 7, 1));
    }
}
