//! Posting primitive and duplicate-posting guard.
//!
//! [`PostingService`] is the single posting-to-balance pipeline: every
//! journal entry in the system, whether from an event poster, a closing, or a
//! reversal, is written and reflected in account balances here. It works
//! inside a caller-supplied unit of work so the guard check, the entry, and
//! the caller's other side effects commit or roll back together.
//!
//! [`Ledger`] wraps the same operations in their own unit of work for callers
//! that post standalone entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use neraca_shared::types::{JournalEntryId, JournalLineId};

use super::balance::{balance_deltas, roll_up_ancestors};
use super::error::{LedgerError, LedgerResult};
use super::reversal::ReversalService;
use super::types::{
    Account, EntryStatus, JournalEntry, JournalLine, PostingRequest, ReversalRequest, SourceRef,
    SourceType,
};
use super::validation::{validate_lines, validate_postable};
use crate::observability::LedgerMetrics;
use crate::store::{LedgerStore, StoreError, UnitOfWork};

/// Posts balanced entries and propagates their balance effects.
#[derive(Clone)]
pub struct PostingService {
    epsilon: Decimal,
    metrics: Arc<dyn LedgerMetrics>,
}

impl std::fmt::Debug for PostingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostingService")
            .field("epsilon", &self.epsilon)
            .finish_non_exhaustive()
    }
}

impl PostingService {
    /// Creates a posting service with the given balance tolerance.
    #[must_use]
    pub fn new(epsilon: Decimal, metrics: Arc<dyn LedgerMetrics>) -> Self {
        Self { epsilon, metrics }
    }

    /// Monetary rounding tolerance.
    #[must_use]
    pub fn epsilon(&self) -> Decimal {
        self.epsilon
    }

    /// Injected observability collaborator.
    #[must_use]
    pub fn metrics(&self) -> &Arc<dyn LedgerMetrics> {
        &self.metrics
    }

    /// Returns true if `source` already has a POSTED entry.
    ///
    /// Must be called on the same unit of work as the write it guards.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn has_existing_entry<U: UnitOfWork>(
        &self,
        uow: &mut U,
        source: SourceRef,
    ) -> LedgerResult<bool> {
        Ok(uow.find_posted_entry(source).await?.is_some())
    }

    /// Posts an entry and updates every referenced account and its ancestors.
    ///
    /// All validation happens before the first write. A posting for a source
    /// that already has a POSTED entry fails with `DuplicatePosting`; event
    /// posters check [`Self::has_existing_entry`] first and skip instead.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `DuplicatePosting`, or a storage error.
    #[instrument(skip(self, uow, request), fields(code = %request.code))]
    pub async fn post<U: UnitOfWork>(
        &self,
        uow: &mut U,
        request: PostingRequest,
    ) -> LedgerResult<JournalEntry> {
        let started = Instant::now();
        let totals = validate_lines(&request.lines, self.epsilon)?;

        let mut accounts: HashMap<_, Account> = HashMap::new();
        for line in &request.lines {
            if accounts.contains_key(&line.account_id) {
                continue;
            }
            let account = uow
                .account(line.account_id)
                .await?
                .ok_or(LedgerError::AccountNotFound(line.account_id))?;
            validate_postable(&account)?;
            accounts.insert(account.id, account);
        }

        if let Some(source) = request.source {
            if self.has_existing_entry(uow, source).await? {
                warn!(%source, "posted entry already exists for source");
                return Err(duplicate(source));
            }
        }

        let code = self.unique_code(uow, &request.code).await?;
        let entry = JournalEntry {
            id: JournalEntryId::new(),
            code,
            entry_date: request.entry_date,
            description: request.description.clone(),
            source: request.source,
            status: EntryStatus::Posted,
            total_debit: totals.debit,
            total_credit: totals.credit,
            is_balanced: true,
            reversal_of: None,
            reversed_by: None,
            created_by: request.created_by,
            created_at: Utc::now(),
        };
        let lines: Vec<JournalLine> = (1_i32..)
            .zip(&request.lines)
            .map(|(line_number, line)| JournalLine {
                id: JournalLineId::new(),
                entry_id: entry.id,
                account_id: line.account_id,
                line_number,
                description: line.description.clone(),
                debit: line.debit,
                credit: line.credit,
            })
            .collect();

        if let Err(err) = uow.insert_entry(entry.clone(), lines).await {
            return Err(match (err, request.source) {
                (StoreError::UniqueViolation(_), Some(source)) => duplicate(source),
                (err, _) => err.into(),
            });
        }

        let deltas = balance_deltas(&request.lines, &accounts);
        let mut touched = Vec::with_capacity(deltas.len());
        for (account_id, delta) in deltas {
            let current = accounts
                .get(&account_id)
                .map_or(Decimal::ZERO, |account| account.balance);
            uow.set_account_balance(account_id, current + delta).await?;
            touched.push(account_id);
        }
        roll_up_ancestors(uow, &touched).await?;

        let source_type = request.source.map(|source| source.source_type);
        self.metrics.record_posting(source_type, request.lines.len());
        self.metrics.record_timing("ledger.post", started.elapsed());
        info!(
            entry_id = %entry.id,
            code = %entry.code,
            total = %entry.total_debit,
            lines = request.lines.len(),
            "journal entry posted"
        );
        Ok(entry)
    }

    /// Posts the reversal of a POSTED entry and links the two.
    ///
    /// The original is marked REVERSED; its lines are never touched.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `NotPosted`, or any posting error.
    #[instrument(skip(self, uow, request), fields(entry_id = %request.entry_id))]
    pub async fn reverse<U: UnitOfWork>(
        &self,
        uow: &mut U,
        request: ReversalRequest,
    ) -> LedgerResult<JournalEntry> {
        let original = uow
            .entry(request.entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(request.entry_id))?;
        if original.status != EntryStatus::Posted {
            return Err(LedgerError::NotPosted(original.id));
        }

        let original_lines = uow.entry_lines(original.id).await?;
        let reversal = self
            .post(
                uow,
                PostingRequest {
                    code: ReversalService::reversal_code(&original.code),
                    entry_date: request.entry_date,
                    description: ReversalService::reversal_description(&original, &request.reason),
                    source: Some(SourceRef::new(SourceType::Reversal, original.id)),
                    lines: ReversalService::reversing_lines(&original_lines),
                    created_by: request.created_by,
                },
            )
            .await?;
        uow.link_reversal(original.id, reversal.id).await?;

        info!(original = %original.code, reversal = %reversal.code, "journal entry reversed");
        Ok(JournalEntry {
            reversal_of: Some(original.id),
            ..reversal
        })
    }

    /// Returns `code`, or `code-N` for the first free N starting at 2.
    async fn unique_code<U: UnitOfWork>(&self, uow: &mut U, code: &str) -> LedgerResult<String> {
        if !uow.entry_code_exists(code).await? {
            return Ok(code.to_string());
        }
        let mut suffix = 2_u32;
        loop {
            let candidate = format!("{code}-{suffix}");
            if !uow.entry_code_exists(&candidate).await? {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}

fn duplicate(source: SourceRef) -> LedgerError {
    LedgerError::DuplicatePosting {
        source_type: source.source_type,
        source_id: source.source_id,
    }
}

/// Standalone ledger operations, each in its own unit of work.
#[derive(Debug)]
pub struct Ledger<S> {
    store: Arc<S>,
    posting: PostingService,
}

impl<S: LedgerStore> Ledger<S> {
    /// Creates a ledger over a store.
    #[must_use]
    pub fn new(store: Arc<S>, posting: PostingService) -> Self {
        Self { store, posting }
    }

    /// Posts a balanced entry atomically.
    ///
    /// # Errors
    ///
    /// See [`PostingService::post`].
    pub async fn post(&self, request: PostingRequest) -> LedgerResult<JournalEntryId> {
        let mut uow = self.store.begin().await?;
        let entry = self.posting.post(&mut uow, request).await?;
        uow.commit().await?;
        Ok(entry.id)
    }

    /// Returns true if a POSTED entry exists for the source.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn has_existing_entry(
        &self,
        source_type: SourceType,
        source_id: Uuid,
    ) -> LedgerResult<bool> {
        let mut uow = self.store.begin().await?;
        self.posting
            .has_existing_entry(&mut uow, SourceRef::new(source_type, source_id))
            .await
    }

    /// Reverses a POSTED entry atomically.
    ///
    /// # Errors
    ///
    /// See [`PostingService::reverse`].
    pub async fn reverse_entry(&self, request: ReversalRequest) -> LedgerResult<JournalEntryId> {
        let mut uow = self.store.begin().await?;
        let entry = self.posting.reverse(&mut uow, request).await?;
        uow.commit().await?;
        Ok(entry.id)
    }
}
