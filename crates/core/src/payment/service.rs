//! The payment allocator.
//!
//! A payment is allocated, journaled, and moved through its register in one
//! unit of work, ending COMPLETED. Cancellation undoes all three in one unit
//! of work and ends FAILED.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use neraca_shared::types::{ContactId, PaymentAllocationId, PaymentId, UserId};

use super::allocation::plan_allocations;
use super::error::{PaymentError, PaymentResult};
use super::types::{
    AllocationRequest, AllocationTarget, CounterpartyRole, NewPayment, Payment,
    PaymentAllocation, PaymentOutcome, PaymentStatus,
};
use crate::cashbank::{CashBankError, CashBankReference, NewCashBankTransaction, append_transaction_in};
use crate::documents::{Purchase, Sale};
use crate::ledger::types::ReversalRequest;
use crate::posting::EventPoster;
use crate::store::{LedgerStore, UnitOfWork};

/// Applies payments to invoices and bills.
#[derive(Debug)]
pub struct PaymentAllocator<S> {
    store: Arc<S>,
    poster: EventPoster<S>,
}

impl<S: LedgerStore> PaymentAllocator<S> {
    /// Creates an allocator that journals payments through `poster`.
    #[must_use]
    pub fn new(store: Arc<S>, poster: EventPoster<S>) -> Self {
        Self { store, poster }
    }

    /// Records a payment, allocates it over `requests` in order, posts its
    /// journal, and moves its register by the full amount.
    ///
    /// # Errors
    ///
    /// Validation and eligibility errors are raised before any write. Any
    /// later failure rolls the whole payment back.
    #[instrument(skip(self, input, requests), fields(code = %input.code, amount = %input.amount, role = input.role.as_str()))]
    pub async fn allocate_payment(
        &self,
        input: NewPayment,
        requests: Vec<AllocationRequest>,
    ) -> PaymentResult<PaymentOutcome> {
        let started = Instant::now();
        if input.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(input.amount));
        }
        if let Some(bad) = requests.iter().find(|r| r.requested <= Decimal::ZERO) {
            return Err(PaymentError::InvalidAllocation {
                target: bad.target,
                requested: bad.requested,
            });
        }
        let epsilon = self.poster.posting().epsilon();

        let mut uow = self.store.begin().await?;
        let cash_bank = uow
            .cash_bank(input.cash_bank_id)
            .await?
            .ok_or(CashBankError::NotFound(input.cash_bank_id))?;
        if input.role == CounterpartyRole::Payable && cash_bank.balance < input.amount {
            warn!(cash_bank = %cash_bank.code, available = %cash_bank.balance, "insufficient balance");
            return Err(PaymentError::InsufficientBalance {
                cash_bank: cash_bank.id,
                available: cash_bank.balance,
                required: input.amount,
            });
        }

        let mut documents: HashMap<AllocationTarget, Document> = HashMap::new();
        for request in &requests {
            if documents.contains_key(&request.target) {
                continue;
            }
            let document = Document::load(&mut uow, request.target).await?;
            document.check_eligible(request.target, input.role, input.contact_id, epsilon)?;
            documents.insert(request.target, document);
        }
        let outstanding: HashMap<_, _> = documents
            .iter()
            .map(|(target, document)| (*target, document.outstanding()))
            .collect();
        let plan = plan_allocations(input.amount, &requests, &outstanding);

        let mut payment = Payment {
            id: PaymentId::new(),
            code: input.code,
            contact_id: input.contact_id,
            role: input.role,
            payment_date: input.payment_date,
            amount: input.amount,
            method: input.method,
            cash_bank_id: input.cash_bank_id,
            status: PaymentStatus::Pending,
            journal_entry_id: None,
            notes: input.notes,
            created_by: input.created_by,
        };
        uow.insert_payment(&payment).await?;

        let mut allocations = Vec::with_capacity(plan.allocations.len());
        for planned in &plan.allocations {
            if let Some(document) = documents.get_mut(&planned.target) {
                document.apply(planned.applied, epsilon);
            }
            let allocation = PaymentAllocation {
                id: PaymentAllocationId::new(),
                payment_id: payment.id,
                target: planned.target,
                amount: planned.applied,
            };
            uow.insert_allocation(&allocation).await?;
            allocations.push(allocation);
        }
        for document in documents.values() {
            document.save(&mut uow).await?;
        }

        let entry = self.poster.post_payment_in(&mut uow, &payment).await?;
        payment.journal_entry_id = entry.map(|e| e.id);

        let movement = append_transaction_in(
            &mut uow,
            NewCashBankTransaction {
                cash_bank_id: payment.cash_bank_id,
                amount: payment.role.cash_direction() * payment.amount,
                reference_type: CashBankReference::Payment,
                reference_id: Some(payment.id.into_inner()),
                transaction_date: payment.payment_date,
                notes: format!("Payment {}", payment.code),
            },
        )
        .await?;

        payment.status = PaymentStatus::Completed;
        uow.update_payment(&payment).await?;
        uow.commit().await?;

        self.poster
            .posting()
            .metrics()
            .record_timing("payment.allocate", started.elapsed());
        info!(
            payment = %payment.code,
            allocated = %plan.allocated(),
            unallocated = %plan.unallocated,
            cash_bank_balance = %movement.balance_after,
            "payment completed"
        );
        Ok(PaymentOutcome {
            payment,
            allocations,
            unallocated: plan.unallocated,
            cash_bank_balance: movement.balance_after,
        })
    }

    /// Cancels a payment, undoing its allocations, register movement, and
    /// journal entry.
    ///
    /// # Errors
    ///
    /// Returns `MissingUser`, `NotFound`, `AlreadyCancelled`,
    /// `InsufficientBalance` when returning a receipt would overdraw the
    /// register, or any collaborator error.
    #[instrument(skip(self, reason))]
    pub async fn cancel_payment(
        &self,
        id: PaymentId,
        reason: &str,
        user: Option<UserId>,
    ) -> PaymentResult<Payment> {
        let user = user.ok_or(PaymentError::MissingUser)?;
        let mut uow = self.store.begin().await?;
        let mut payment = uow.payment(id).await?.ok_or(PaymentError::NotFound(id))?;
        if payment.status == PaymentStatus::Failed {
            return Err(PaymentError::AlreadyCancelled(id));
        }

        for allocation in uow.allocations_for_payment(id).await? {
            let mut document = Document::load(&mut uow, allocation.target).await?;
            document.revert(allocation.amount);
            document.save(&mut uow).await?;
        }

        if payment.status == PaymentStatus::Completed {
            let movement = -payment.role.cash_direction() * payment.amount;
            let cash_bank = uow
                .cash_bank(payment.cash_bank_id)
                .await?
                .ok_or(CashBankError::NotFound(payment.cash_bank_id))?;
            if cash_bank.balance + movement < Decimal::ZERO {
                return Err(PaymentError::InsufficientBalance {
                    cash_bank: cash_bank.id,
                    available: cash_bank.balance,
                    required: payment.amount,
                });
            }
            append_transaction_in(
                &mut uow,
                NewCashBankTransaction {
                    cash_bank_id: payment.cash_bank_id,
                    amount: movement,
                    reference_type: CashBankReference::PaymentReversal,
                    reference_id: Some(payment.id.into_inner()),
                    transaction_date: Utc::now().date_naive(),
                    notes: format!("Cancellation of payment {}", payment.code),
                },
            )
            .await?;
        }

        if let Some(entry_id) = payment.journal_entry_id {
            self.poster
                .posting()
                .reverse(
                    &mut uow,
                    ReversalRequest {
                        entry_id,
                        entry_date: Utc::now().date_naive(),
                        reason: reason.to_string(),
                        created_by: Some(user),
                    },
                )
                .await?;
        }

        payment.status = PaymentStatus::Failed;
        if !payment.notes.is_empty() {
            payment.notes.push('\n');
        }
        payment.notes.push_str(&format!("Cancelled: {reason}"));
        uow.update_payment(&payment).await?;
        uow.commit().await?;

        info!(payment = %payment.code, %user, "payment cancelled");
        Ok(payment)
    }
}

/// A loaded allocation target.
enum Document {
    Sale(Sale),
    Purchase(Purchase),
}

impl Document {
    async fn load<U: UnitOfWork>(uow: &mut U, target: AllocationTarget) -> PaymentResult<Self> {
        let document = match target {
            AllocationTarget::Sale(id) => uow.sale(id).await?.map(Self::Sale),
            AllocationTarget::Purchase(id) => uow.purchase(id).await?.map(Self::Purchase),
        };
        document.ok_or(PaymentError::TargetNotFound(target))
    }

    async fn save<U: UnitOfWork>(&self, uow: &mut U) -> PaymentResult<()> {
        match self {
            Self::Sale(sale) => uow.update_sale_settlement(sale).await?,
            Self::Purchase(purchase) => uow.update_purchase_settlement(purchase).await?,
        }
        Ok(())
    }

    fn outstanding(&self) -> Decimal {
        match self {
            Self::Sale(sale) => sale.settlement.outstanding_amount,
            Self::Purchase(purchase) => purchase.settlement.outstanding_amount,
        }
    }

    /// Uses the same status gate as the event posters.
    fn check_eligible(
        &self,
        target: AllocationTarget,
        role: CounterpartyRole,
        contact: ContactId,
        epsilon: Decimal,
    ) -> PaymentResult<()> {
        let (expected_role, owner, recognized, status) = match self {
            Self::Sale(sale) => (
                CounterpartyRole::Receivable,
                sale.customer_id,
                sale.status.is_recognized(),
                sale.status.as_str(),
            ),
            Self::Purchase(purchase) => (
                CounterpartyRole::Payable,
                purchase.vendor_id,
                purchase.status.is_recognized(),
                purchase.status.as_str(),
            ),
        };
        if role != expected_role {
            return Err(PaymentError::TargetRoleMismatch { target, role });
        }
        if owner != contact {
            return Err(PaymentError::ContactMismatch(target));
        }
        if !recognized {
            warn!(%target, status, "target not eligible for payment");
            return Err(PaymentError::TargetNotEligible { target, status });
        }
        if self.outstanding() <= epsilon {
            return Err(PaymentError::TargetSettled(target));
        }
        Ok(())
    }

    fn apply(&mut self, amount: Decimal, epsilon: Decimal) {
        match self {
            Self::Sale(sale) => sale.apply_payment(amount, epsilon),
            Self::Purchase(purchase) => purchase.apply_payment(amount, epsilon),
        }
    }

    fn revert(&mut self, amount: Decimal) {
        match self {
            Self::Sale(sale) => sale.revert_payment(amount),
            Self::Purchase(purchase) => purchase.revert_payment(amount),
        }
    }
}
