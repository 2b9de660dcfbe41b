//! The event poster.
//!
//! One poster serves every document type. It resolves a template's legs to
//! accounts, applies the duplicate guard, and posts through the shared
//! [`PostingService`]. Status changes are handled by comparing the existing
//! entry with what the document would post now.

use std::sync::Arc;

use tracing::{info, instrument};

use neraca_shared::types::{AccountId, CashBankId, JournalEntryId, PaymentId, PurchaseId, SaleId, UserId};

use super::accounts::{AccountResolver, SettingsLookup};
use super::error::{PostingError, PostingResult};
use super::templates::{JournalTemplate, PaymentTemplate, PurchaseTemplate, SaleTemplate};
use super::transition::TransitionAction;
use crate::documents::{PurchaseStatus, SaleStatus};
use crate::ledger::types::{JournalEntry, LineInput, PostingRequest, ReversalRequest};
use crate::ledger::{LedgerError, PostingService};
use crate::payment::{CounterpartyRole, Payment};
use crate::store::{LedgerStore, UnitOfWork};

/// Turns business documents into journal entries.
#[derive(Debug)]
pub struct EventPoster<S> {
    store: Arc<S>,
    posting: PostingService,
    resolver: AccountResolver,
}

impl<S> Clone for EventPoster<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            posting: self.posting.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<S: LedgerStore> EventPoster<S> {
    /// Creates a poster.
    #[must_use]
    pub fn new(store: Arc<S>, posting: PostingService, settings: Arc<dyn SettingsLookup>) -> Self {
        Self {
            store,
            posting,
            resolver: AccountResolver::new(settings),
        }
    }

    /// Posting pipeline shared with the other services.
    #[must_use]
    pub fn posting(&self) -> &PostingService {
        &self.posting
    }

    /// Posts a sales invoice if it qualifies and has no entry yet.
    ///
    /// Returns `None` when skipped, including when a concurrent call posted
    /// the same invoice first.
    ///
    /// # Errors
    ///
    /// Returns `SaleNotFound`, an unresolved account role, or a ledger error.
    #[instrument(skip(self))]
    pub async fn post_sale(&self, sale_id: SaleId) -> PostingResult<Option<JournalEntryId>> {
        let mut uow = self.store.begin().await?;
        let sale = uow
            .sale(sale_id)
            .await?
            .ok_or(PostingError::SaleNotFound(sale_id))?;
        let linked = linked_account(&mut uow, sale.cash_bank_id).await?;
        let posted = self
            .post_template(&mut uow, &SaleTemplate::new(&sale, linked), None)
            .await;
        self.settle(uow, posted).await
    }

    /// Brings a sale's journal in line with its current status and amounts.
    ///
    /// # Errors
    ///
    /// Returns `SaleNotFound`, an unresolved account role, or a ledger error.
    #[instrument(skip(self))]
    pub async fn on_sale_status_change(
        &self,
        sale_id: SaleId,
        previous: SaleStatus,
    ) -> PostingResult<TransitionAction> {
        let mut uow = self.store.begin().await?;
        let sale = uow
            .sale(sale_id)
            .await?
            .ok_or(PostingError::SaleNotFound(sale_id))?;
        let linked = linked_account(&mut uow, sale.cash_bank_id).await?;
        let action = self
            .apply_transition(&mut uow, &SaleTemplate::new(&sale, linked))
            .await?;
        uow.commit().await?;
        info!(
            sale = %sale.code,
            from = previous.as_str(),
            to = sale.status.as_str(),
            ?action,
            "sale journal reconciled"
        );
        Ok(action)
    }

    /// Posts a purchase bill if it qualifies and has no entry yet.
    ///
    /// Returns `None` when skipped, including when a concurrent call posted
    /// the same bill first.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseNotFound`, an unresolved account role, or a ledger error.
    #[instrument(skip(self))]
    pub async fn post_purchase(
        &self,
        purchase_id: PurchaseId,
    ) -> PostingResult<Option<JournalEntryId>> {
        let mut uow = self.store.begin().await?;
        let purchase = uow
            .purchase(purchase_id)
            .await?
            .ok_or(PostingError::PurchaseNotFound(purchase_id))?;
        let linked = linked_account(&mut uow, purchase.cash_bank_id).await?;
        let posted = self
            .post_template(&mut uow, &PurchaseTemplate::new(&purchase, linked), None)
            .await;
        self.settle(uow, posted).await
    }

    /// Brings a purchase's journal in line with its current status and amounts.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseNotFound`, an unresolved account role, or a ledger error.
    #[instrument(skip(self))]
    pub async fn on_purchase_status_change(
        &self,
        purchase_id: PurchaseId,
        previous: PurchaseStatus,
    ) -> PostingResult<TransitionAction> {
        let mut uow = self.store.begin().await?;
        let purchase = uow
            .purchase(purchase_id)
            .await?
            .ok_or(PostingError::PurchaseNotFound(purchase_id))?;
        let linked = linked_account(&mut uow, purchase.cash_bank_id).await?;
        let action = self
            .apply_transition(&mut uow, &PurchaseTemplate::new(&purchase, linked))
            .await?;
        uow.commit().await?;
        info!(
            purchase = %purchase.code,
            from = previous.as_str(),
            to = purchase.status.as_str(),
            ?action,
            "purchase journal reconciled"
        );
        Ok(action)
    }

    /// Posts the journal of a customer payment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound`, `PaymentRoleMismatch`, or a posting error.
    pub async fn post_sales_payment(
        &self,
        payment_id: PaymentId,
    ) -> PostingResult<Option<JournalEntryId>> {
        self.post_payment_by_id(payment_id, CounterpartyRole::Receivable)
            .await
    }

    /// Posts the journal of a vendor payment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound`, `PaymentRoleMismatch`, or a posting error.
    pub async fn post_vendor_payment(
        &self,
        payment_id: PaymentId,
    ) -> PostingResult<Option<JournalEntryId>> {
        self.post_payment_by_id(payment_id, CounterpartyRole::Payable)
            .await
    }

    /// Commits a document posting. Losing the source's unique index to a
    /// concurrent poster rolls the unit of work back and counts as a skip.
    async fn settle(
        &self,
        uow: S::Unit,
        posted: PostingResult<Option<JournalEntry>>,
    ) -> PostingResult<Option<JournalEntryId>> {
        match posted {
            Ok(entry) => {
                uow.commit().await?;
                Ok(entry.map(|e| e.id))
            }
            Err(PostingError::Ledger(LedgerError::DuplicatePosting {
                source_type,
                source_id,
            })) => {
                drop(uow);
                self.posting.metrics().record_duplicate_skipped(source_type);
                info!(%source_type, %source_id, "entry posted concurrently, skipping");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn post_payment_by_id(
        &self,
        payment_id: PaymentId,
        expected: CounterpartyRole,
    ) -> PostingResult<Option<JournalEntryId>> {
        let mut uow = self.store.begin().await?;
        let payment = uow
            .payment(payment_id)
            .await?
            .ok_or(PostingError::PaymentNotFound(payment_id))?;
        if payment.role != expected {
            return Err(PostingError::PaymentRoleMismatch {
                payment: payment_id,
                expected,
            });
        }
        let entry = self.post_payment_in(&mut uow, &payment).await?;
        if let Some(entry) = &entry {
            let mut payment = payment;
            payment.journal_entry_id = Some(entry.id);
            uow.update_payment(&payment).await?;
        }
        uow.commit().await?;
        Ok(entry.map(|e| e.id))
    }
}

impl<S> EventPoster<S> {
    /// Posts a payment's journal inside the caller's unit of work.
    ///
    /// Returns `None` when the payment does not qualify or already has an
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns `CashBankNotFound`, an unresolved account role, or a ledger error.
    pub async fn post_payment_in<U: UnitOfWork>(
        &self,
        uow: &mut U,
        payment: &Payment,
    ) -> PostingResult<Option<JournalEntry>> {
        let cash_bank = uow
            .cash_bank(payment.cash_bank_id)
            .await?
            .ok_or(PostingError::CashBankNotFound(payment.cash_bank_id))?;
        let template = PaymentTemplate::new(payment, cash_bank.account_id);
        self.post_template(uow, &template, payment.created_by).await
    }

    /// Posts a template unless it does not qualify or the guard finds an
    /// existing entry.
    async fn post_template<U: UnitOfWork, T: JournalTemplate + Sync>(
        &self,
        uow: &mut U,
        template: &T,
        created_by: Option<UserId>,
    ) -> PostingResult<Option<JournalEntry>> {
        if !template.qualifies() {
            return Ok(None);
        }
        let source = template.source();
        if self.posting.has_existing_entry(uow, source).await? {
            self.posting
                .metrics()
                .record_duplicate_skipped(source.source_type);
            info!(%source, "entry already posted, skipping");
            return Ok(None);
        }
        let lines = self.build_lines(uow, template).await?;
        let entry = self
            .posting
            .post(
                uow,
                PostingRequest {
                    code: template.code(),
                    entry_date: template.entry_date(),
                    description: template.description(),
                    source: Some(source),
                    lines,
                    created_by,
                },
            )
            .await?;
        Ok(Some(entry))
    }

    /// Reconciles the existing entry with what the template would post now.
    async fn apply_transition<U: UnitOfWork, T: JournalTemplate + Sync>(
        &self,
        uow: &mut U,
        template: &T,
    ) -> PostingResult<TransitionAction> {
        let source = template.source();
        let existing = uow.find_posted_entry(source).await?;
        let existing_lines: Option<Vec<LineInput>> = match &existing {
            Some(entry) => Some(
                uow.entry_lines(entry.id)
                    .await?
                    .iter()
                    .map(|line| line.to_input())
                    .collect(),
            ),
            None => None,
        };
        let proposed = if template.qualifies() {
            Some(self.build_lines(uow, template).await?)
        } else {
            None
        };

        let action = TransitionAction::decide(existing_lines.as_deref(), proposed.as_deref());
        if let (Some(entry), TransitionAction::Reverse | TransitionAction::Recreate) =
            (&existing, action)
        {
            self.posting
                .reverse(
                    uow,
                    ReversalRequest {
                        entry_id: entry.id,
                        entry_date: template.entry_date(),
                        reason: format!("{} changed", template.description()),
                        created_by: None,
                    },
                )
                .await?;
        }
        if let (Some(lines), TransitionAction::Create | TransitionAction::Recreate) =
            (proposed, action)
        {
            self.posting
                .post(
                    uow,
                    PostingRequest {
                        code: template.code(),
                        entry_date: template.entry_date(),
                        description: template.description(),
                        source: Some(source),
                        lines,
                        created_by: None,
                    },
                )
                .await?;
        }
        Ok(action)
    }

    /// Resolves every non-zero leg to a line, debits first.
    async fn build_lines<U: UnitOfWork, T: JournalTemplate + Sync>(
        &self,
        uow: &mut U,
        template: &T,
    ) -> PostingResult<Vec<LineInput>> {
        let mut lines = Vec::new();
        for leg in template.debit_legs() {
            if leg.amount.is_zero() {
                continue;
            }
            let account = self.resolver.resolve(uow, leg.account).await?;
            lines.push(LineInput::debit(account, leg.amount, leg.description));
        }
        for leg in template.credit_legs() {
            if leg.amount.is_zero() {
                continue;
            }
            let account = self.resolver.resolve(uow, leg.account).await?;
            lines.push(LineInput::credit(account, leg.amount, leg.description));
        }
        Ok(lines)
    }
}

/// Returns the GL account linked to a register, if the document has one.
async fn linked_account<U: UnitOfWork>(
    uow: &mut U,
    cash_bank_id: Option<CashBankId>,
) -> PostingResult<Option<AccountId>> {
    let Some(id) = cash_bank_id else {
        return Ok(None);
    };
    let cash_bank = uow
        .cash_bank(id)
        .await?
        .ok_or(PostingError::CashBankNotFound(id))?;
    Ok(cash_bank.account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::PaymentMethod;
    use crate::ledger::types::{EntryStatus, SourceRef, SourceType};
    use crate::observability::testing::RecordingMetrics;
    use crate::posting::accounts::MockSettingsLookup;
    use crate::store::MemoryStore;
    use crate::testing::{Chart, cash_bank, posting_service, purchase, sale, shared, standard_chart};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn no_settings() -> Arc<dyn SettingsLookup> {
        let mut mock = MockSettingsLookup::new();
        mock.expect_account_for_role().return_const(None::<AccountId>);
        Arc::new(mock)
    }

    fn poster(store: &MemoryStore) -> EventPoster<MemoryStore> {
        EventPoster::new(shared(store), posting_service(), no_settings())
    }

    async fn lines_of(store: &MemoryStore, entry: JournalEntryId) -> Vec<(AccountId, Decimal, Decimal)> {
        store.snapshot().await.lines[&entry]
            .iter()
            .map(|l| (l.account_id, l.debit, l.credit))
            .collect()
    }

    fn balance(state: &crate::store::memory::MemoryState, chart: &Chart, code: &str) -> Decimal {
        state.accounts[&chart.id(code)].balance
    }

    #[tokio::test]
    async fn test_cash_sale_posts_expected_lines() {
        let (store, chart) = standard_chart().await;
        let doc = sale(SaleStatus::Invoiced, PaymentMethod::from_code("CASH"), dec!(1000000), dec!(110000));
        store.insert_sale(doc.clone()).await;

        let entry = poster(&store).post_sale(doc.id).await.unwrap().unwrap();

        assert_eq!(
            lines_of(&store, entry).await,
            vec![
                (chart.id("1101"), dec!(1110000), Decimal::ZERO),
                (chart.id("4101"), Decimal::ZERO, dec!(1000000)),
                (chart.id("2103"), Decimal::ZERO, dec!(110000)),
            ]
        );
    }

    #[tokio::test]
    async fn test_tax_free_sale_omits_tax_line() {
        let (store, chart) = standard_chart().await;
        let doc = sale(SaleStatus::Invoiced, PaymentMethod::Credit, dec!(250000), Decimal::ZERO);
        store.insert_sale(doc.clone()).await;

        let entry = poster(&store).post_sale(doc.id).await.unwrap().unwrap();

        assert_eq!(
            lines_of(&store, entry).await,
            vec![
                (chart.id("1201"), dec!(250000), Decimal::ZERO),
                (chart.id("4101"), Decimal::ZERO, dec!(250000)),
            ]
        );
    }

    #[tokio::test]
    async fn test_bank_sale_uses_register_account() {
        let (store, chart) = standard_chart().await;
        let register = cash_bank(&store, "BANK-BCA", Some(chart.id("1102")), Decimal::ZERO).await;
        let mut doc = sale(SaleStatus::Invoiced, PaymentMethod::Bank, dec!(100), Decimal::ZERO);
        doc.cash_bank_id = Some(register.id);
        store.insert_sale(doc.clone()).await;

        let entry = poster(&store).post_sale(doc.id).await.unwrap().unwrap();
        assert_eq!(lines_of(&store, entry).await[0].0, chart.id("1102"));
    }

    #[tokio::test]
    async fn test_reposting_is_idempotent() {
        let (store, chart) = standard_chart().await;
        let metrics = Arc::new(RecordingMetrics::default());
        let poster = EventPoster::new(
            shared(&store),
            PostingService::new(dec!(0.01), metrics.clone()),
            no_settings(),
        );
        let doc = sale(SaleStatus::Invoiced, PaymentMethod::Cash, dec!(1000), dec!(110));
        store.insert_sale(doc.clone()).await;

        assert!(poster.post_sale(doc.id).await.unwrap().is_some());
        assert!(poster.post_sale(doc.id).await.unwrap().is_none());

        let state = store.snapshot().await;
        assert_eq!(state.entries_for(SourceRef::new(SourceType::Sales, doc.id)).len(), 1);
        assert_eq!(balance(&state, &chart, "1101"), dec!(1110));
        assert_eq!(metrics.duplicates.lock().unwrap().as_slice(), &[SourceType::Sales]);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_rolls_back_and_skips() {
        let (store, chart) = standard_chart().await;
        let metrics = Arc::new(RecordingMetrics::default());
        let poster = EventPoster::new(
            shared(&store),
            PostingService::new(dec!(0.01), metrics.clone()),
            no_settings(),
        );
        let source_id = uuid::Uuid::now_v7();

        // A write made before the unique index rejected the entry.
        let mut uow = store.begin().await.unwrap();
        uow.set_account_balance(chart.id("1101"), dec!(999)).await.unwrap();
        let lost = Err(PostingError::Ledger(LedgerError::DuplicatePosting {
            source_type: SourceType::Sales,
            source_id,
        }));

        assert_eq!(poster.settle(uow, lost).await.unwrap(), None);

        let state = store.snapshot().await;
        assert_eq!(balance(&state, &chart, "1101"), Decimal::ZERO);
        assert_eq!(metrics.duplicates.lock().unwrap().as_slice(), &[SourceType::Sales]);
    }

    #[tokio::test]
    async fn test_settle_propagates_other_ledger_errors() {
        let (store, chart) = standard_chart().await;
        let uow = store.begin().await.unwrap();
        let failed = Err(PostingError::Ledger(LedgerError::AccountInactive(chart.id("1101"))));

        let err = poster(&store).settle(uow, failed).await.unwrap_err();
        assert!(matches!(err, PostingError::Ledger(LedgerError::AccountInactive(_))));
    }

    #[tokio::test]
    async fn test_draft_sale_is_skipped() {
        let (store, _) = standard_chart().await;
        let doc = sale(SaleStatus::Draft, PaymentMethod::Cash, dec!(1000), dec!(0));
        store.insert_sale(doc.clone()).await;

        assert!(poster(&store).post_sale(doc.id).await.unwrap().is_none());
        assert!(store.snapshot().await.entries.is_empty());
    }

    #[tokio::test]
    async fn test_missing_account_fails_whole_posting() {
        let empty = MemoryStore::new();
        let doc = sale(SaleStatus::Invoiced, PaymentMethod::Cash, dec!(1000), dec!(110));
        empty.insert_sale(doc.clone()).await;

        let err = poster(&empty).post_sale(doc.id).await.unwrap_err();
        assert!(matches!(err, PostingError::AccountRoleUnresolved(_)));
        assert!(empty.snapshot().await.entries.is_empty());
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (store, chart) = standard_chart().await;
        let poster = poster(&store);
        let mut doc = sale(SaleStatus::Draft, PaymentMethod::Credit, dec!(1000), dec!(110));
        store.insert_sale(doc.clone()).await;

        // Draft -> Draft: nothing.
        let action = poster.on_sale_status_change(doc.id, SaleStatus::Draft).await.unwrap();
        assert_eq!(action, TransitionAction::Skip);

        // Draft -> Invoiced: create.
        doc.status = SaleStatus::Invoiced;
        store.replace_sale(doc.clone()).await;
        let action = poster.on_sale_status_change(doc.id, SaleStatus::Draft).await.unwrap();
        assert_eq!(action, TransitionAction::Create);
        assert_eq!(balance(&store.snapshot().await, &chart, "1201"), dec!(1110));

        // Invoiced -> Overdue with same amounts: keep.
        doc.status = SaleStatus::Overdue;
        store.replace_sale(doc.clone()).await;
        let action = poster.on_sale_status_change(doc.id, SaleStatus::Invoiced).await.unwrap();
        assert_eq!(action, TransitionAction::Keep);

        // Amounts changed: recreate.
        doc.subtotal = dec!(2000);
        doc.tax_amount = dec!(220);
        store.replace_sale(doc.clone()).await;
        let action = poster.on_sale_status_change(doc.id, SaleStatus::Overdue).await.unwrap();
        assert_eq!(action, TransitionAction::Recreate);
        let state = store.snapshot().await;
        assert_eq!(balance(&state, &chart, "1201"), dec!(2220));
        assert_eq!(balance(&state, &chart, "4101"), dec!(2000));
        let posted: Vec<_> = state
            .entries_for(SourceRef::new(SourceType::Sales, doc.id))
            .into_iter()
            .filter(|e| e.status == EntryStatus::Posted)
            .collect();
        assert_eq!(posted.len(), 1);

        // Cancelled: reverse.
        doc.status = SaleStatus::Cancelled;
        store.replace_sale(doc.clone()).await;
        let action = poster.on_sale_status_change(doc.id, SaleStatus::Overdue).await.unwrap();
        assert_eq!(action, TransitionAction::Reverse);
        let state = store.snapshot().await;
        for code in ["1201", "4101", "2103", "1000"] {
            assert_eq!(balance(&state, &chart, code), Decimal::ZERO, "{code}");
        }
    }

    #[tokio::test]
    async fn test_purchase_with_withholding_posts_balanced_entry() {
        let (store, chart) = standard_chart().await;
        let mut bill = purchase(PurchaseStatus::Approved, PaymentMethod::Credit, dec!(2000000), dec!(220000));
        bill.pph23_amount = dec!(40000);
        store.insert_purchase(bill.clone()).await;

        poster(&store).post_purchase(bill.id).await.unwrap().unwrap();

        let state = store.snapshot().await;
        assert_eq!(balance(&state, &chart, "1301"), dec!(2000000));
        assert_eq!(balance(&state, &chart, "1240"), dec!(220000));
        assert_eq!(balance(&state, &chart, "2101"), dec!(2180000));
        assert_eq!(balance(&state, &chart, "2112"), dec!(40000));
        assert_eq!(balance(&state, &chart, "2111"), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_pending_purchase_is_skipped_until_approved() {
        let (store, _) = standard_chart().await;
        let poster = poster(&store);
        let mut bill = purchase(PurchaseStatus::PendingApproval, PaymentMethod::Cash, dec!(500), dec!(0));
        store.insert_purchase(bill.clone()).await;
        assert!(poster.post_purchase(bill.id).await.unwrap().is_none());

        bill.status = PurchaseStatus::Approved;
        store.replace_purchase(bill.clone()).await;
        let action = poster
            .on_purchase_status_change(bill.id, PurchaseStatus::PendingApproval)
            .await
            .unwrap();
        assert_eq!(action, TransitionAction::Create);
    }

    #[tokio::test]
    async fn test_sale_not_found() {
        let (store, _) = standard_chart().await;
        let err = poster(&store).post_sale(SaleId::new()).await.unwrap_err();
        assert!(matches!(err, PostingError::SaleNotFound(_)));
    }
}
