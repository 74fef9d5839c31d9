use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::audit::{record_best_effort, AuditEvent, AuditSink};
use crate::domain::{
    AuditAction, EntityKind, OrganizationId, Payment, PaymentId, PaymentStatus, StateConflict,
};
use crate::store::{PropertyStore, StoreError, StoreTransaction, TenantFilter};

/// What to do when a settlement request lands on a payment that is already
/// paid. Strict mirrors lease activation's one-shot contract; idempotent
/// hands retry-friendly clients the stored row instead of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatSettlementPolicy {
    #[default]
    Strict,
    Idempotent,
}

/// Error raised by the settlement service.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    #[error(transparent)]
    Conflict(#[from] StateConflict),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn not_found(id: &PaymentId) -> SettlementError {
    SettlementError::NotFound {
        entity: EntityKind::Payment,
        id: id.0.clone(),
    }
}

/// Service owning the PENDING/OVERDUE→PAID transition.
pub struct SettlementService<S, A> {
    store: Arc<S>,
    audit: Arc<A>,
    repeat_policy: RepeatSettlementPolicy,
}

impl<S, A> SettlementService<S, A>
where
    S: PropertyStore + 'static,
    A: AuditSink + 'static,
{
    pub fn new(store: Arc<S>, audit: Arc<A>, repeat_policy: RepeatSettlementPolicy) -> Self {
        Self {
            store,
            audit,
            repeat_policy,
        }
    }

    /// Marks a pending or overdue payment as paid.
    ///
    /// The transition is a conditional update; a caller that loses a race
    /// re-reads the row and is answered from its now-current status, the
    /// same way a straight call against that status would be.
    pub fn mark_paid(
        &self,
        payment_id: &PaymentId,
        organization: &OrganizationId,
        paid_at: Option<DateTime<Utc>>,
        actor: Option<&str>,
    ) -> Result<Payment, SettlementError> {
        let filter = TenantFilter::for_organization(organization.clone());

        let payment = self
            .store
            .payment(payment_id, &filter)?
            .ok_or_else(|| not_found(payment_id))?;
        if !payment.status.settleable() {
            return self.resolve_unsettleable(payment);
        }

        let paid_at = paid_at.unwrap_or_else(Utc::now);
        let mut tx = self.store.transaction()?;
        let affected = tx.transition_payment(
            payment_id,
            &filter,
            &[PaymentStatus::Pending, PaymentStatus::Overdue],
            PaymentStatus::Paid,
            Some(paid_at),
        )?;
        if affected == 0 {
            // Lost the race. Release the transaction before re-reading.
            drop(tx);
            let current = self
                .store
                .payment(payment_id, &filter)?
                .ok_or_else(|| not_found(payment_id))?;
            return self.resolve_unsettleable(current);
        }
        tx.commit()?;

        record_best_effort(
            self.audit.as_ref(),
            AuditEvent {
                organization: organization.clone(),
                user_id: actor.map(str::to_string),
                entity: EntityKind::Payment,
                entity_id: payment_id.0.clone(),
                action: AuditAction::PaymentMarkPaid,
                metadata: Some(serde_json::json!({
                    "previous_status": payment.status.label(),
                    "paid_at": paid_at,
                })),
            },
        );

        Ok(Payment {
            status: PaymentStatus::Paid,
            paid_at: Some(paid_at),
            ..payment
        })
    }

    /// Answers for a payment that cannot be settled from its current
    /// status. Already-paid rows go through the repeat policy; every other
    /// terminal or partial status is a conflict.
    fn resolve_unsettleable(&self, payment: Payment) -> Result<Payment, SettlementError> {
        if payment.status == PaymentStatus::Paid
            && self.repeat_policy == RepeatSettlementPolicy::Idempotent
        {
            return Ok(payment);
        }
        Err(StateConflict::PaymentNotSettleable {
            id: payment.id,
            status: payment.status,
        }
        .into())
    }
}
