use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::invoice::first_cycle_payments;
use crate::audit::{record_best_effort, AuditEvent, AuditSink};
use crate::domain::{
    BillCycle, EntityKind, Lease, LeaseId, LeaseStatus, OrganizationId, Payment, PropertyId,
    RelationViolation, StateConflict, Tenant, TenantId, Unit, UnitId, UnitStatus,
};
use crate::store::{PropertyStore, StoreError, StoreTransaction, TenantFilter};

/// Caller-supplied shape of a new lease; the id and PENDING status are
/// assigned here.
#[derive(Debug, Clone)]
pub struct LeaseDraft {
    pub organization: OrganizationId,
    pub property_id: PropertyId,
    pub unit_id: UnitId,
    pub tenant_id: TenantId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub rent_amount: u32,
    pub deposit_amount: Option<u32>,
    pub bill_cycle: BillCycle,
}

/// Everything the activation transition produced.
#[derive(Debug, Clone, Serialize)]
pub struct LeaseActivation {
    pub lease: Lease,
    pub unit: Unit,
    pub payments: Vec<Payment>,
}

/// Error raised by the lease lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum LeasingError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    #[error(transparent)]
    Conflict(#[from] StateConflict),
    #[error(transparent)]
    InvalidRelation(#[from] RelationViolation),
    #[error(transparent)]
    Store(#[from] StoreError),
}

static LEASE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_lease_id() -> LeaseId {
    let id = LEASE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeaseId(format!("lease-{id:06}"))
}

fn not_found(entity: EntityKind, id: impl Into<String>) -> LeasingError {
    LeasingError::NotFound {
        entity,
        id: id.into(),
    }
}

fn conflict_for_lease_status(id: &LeaseId, status: LeaseStatus) -> LeasingError {
    match status {
        LeaseStatus::Active => StateConflict::LeaseAlreadyActive(id.clone()).into(),
        other => StateConflict::LeaseStatusInvalid {
            id: id.clone(),
            status: other,
        }
        .into(),
    }
}

/// Service owning lease drafting and the PENDING→ACTIVE transition.
pub struct LeaseService<S, A> {
    store: Arc<S>,
    audit: Arc<A>,
}

impl<S, A> LeaseService<S, A>
where
    S: PropertyStore + 'static,
    A: AuditSink + 'static,
{
    pub fn new(store: Arc<S>, audit: Arc<A>) -> Self {
        Self { store, audit }
    }

    /// Validates the parent chain and inserts a PENDING lease. Nothing is
    /// written when any check fails.
    pub fn create(&self, draft: LeaseDraft) -> Result<Lease, LeasingError> {
        let filter = TenantFilter::for_organization(draft.organization.clone());

        let property = self
            .store
            .property(&draft.property_id, &filter)?
            .ok_or_else(|| not_found(EntityKind::Property, draft.property_id.0.clone()))?;
        let unit = self
            .store
            .unit(&draft.unit_id, &filter)?
            .ok_or_else(|| not_found(EntityKind::Unit, draft.unit_id.0.clone()))?;
        let tenant: Tenant = self
            .store
            .tenant(&draft.tenant_id, &filter)?
            .ok_or_else(|| not_found(EntityKind::Tenant, draft.tenant_id.0.clone()))?;

        // The scoped fetches already hide foreign rows; these checks cover
        // flows that run with an explicitly unscoped filter.
        if property.organization_id != draft.organization {
            return Err(RelationViolation::PropertyOutsideOrganization {
                property: property.id,
                organization: draft.organization,
            }
            .into());
        }
        if tenant.organization_id != draft.organization {
            return Err(RelationViolation::TenantOutsideOrganization {
                tenant: tenant.id,
                organization: draft.organization,
            }
            .into());
        }
        if unit.property_id != draft.property_id {
            return Err(RelationViolation::UnitOutsideProperty {
                unit: unit.id,
                property: draft.property_id,
            }
            .into());
        }

        let lease = Lease {
            id: next_lease_id(),
            organization_id: draft.organization,
            property_id: draft.property_id,
            unit_id: draft.unit_id,
            tenant_id: draft.tenant_id,
            status: LeaseStatus::Pending,
            start_date: draft.start_date,
            end_date: draft.end_date,
            rent_amount: draft.rent_amount,
            deposit_amount: draft.deposit_amount,
            bill_cycle: draft.bill_cycle,
        };
        self.store.insert_lease(lease.clone())?;
        Ok(lease)
    }

    /// Moves a PENDING lease to ACTIVE exactly once, occupying its unit and
    /// raising the first-cycle payments in the same transaction.
    ///
    /// Under concurrent attempts the conditional transition picks a single
    /// winner; every other caller gets a Conflict matching the status it
    /// observed after losing. A repeat call is always a conflict.
    pub fn activate(
        &self,
        lease_id: &LeaseId,
        organization: &OrganizationId,
        actor: Option<&str>,
    ) -> Result<LeaseActivation, LeasingError> {
        let filter = TenantFilter::for_organization(organization.clone());

        let lease = self
            .store
            .lease(lease_id, &filter)?
            .ok_or_else(|| not_found(EntityKind::Lease, lease_id.0.clone()))?;
        if lease.status != LeaseStatus::Pending {
            return Err(conflict_for_lease_status(lease_id, lease.status));
        }

        let unit = self
            .store
            .unit(&lease.unit_id, &filter)?
            .ok_or_else(|| not_found(EntityKind::Unit, lease.unit_id.0.clone()))?;
        if !unit.status.accepts_occupancy() {
            return Err(StateConflict::UnitNotVacant {
                id: unit.id,
                status: unit.status,
            }
            .into());
        }

        let payments = first_cycle_payments(&lease);

        let mut tx = self.store.transaction()?;
        let affected =
            tx.transition_lease(lease_id, &filter, LeaseStatus::Pending, LeaseStatus::Active)?;
        if affected == 0 {
            // Lost the race. Release the transaction before re-reading.
            drop(tx);
            let current = self
                .store
                .lease(lease_id, &filter)?
                .ok_or_else(|| not_found(EntityKind::Lease, lease_id.0.clone()))?;
            return Err(conflict_for_lease_status(lease_id, current.status));
        }
        tx.set_unit_status(&lease.unit_id, &filter, UnitStatus::Occupied)?;
        for payment in &payments {
            tx.insert_payment(payment.clone())?;
        }
        tx.commit()?;

        let payment_ids: Vec<&str> = payments.iter().map(|p| p.id.0.as_str()).collect();
        record_best_effort(
            self.audit.as_ref(),
            AuditEvent {
                organization: organization.clone(),
                user_id: actor.map(str::to_string),
                entity: EntityKind::Lease,
                entity_id: lease_id.0.clone(),
                action: crate::domain::AuditAction::LeaseActivated,
                metadata: Some(serde_json::json!({
                    "unit_id": lease.unit_id.0.clone(),
                    "payment_ids": payment_ids,
                })),
            },
        );

        Ok(LeaseActivation {
            lease: Lease {
                status: LeaseStatus::Active,
                ..lease
            },
            unit: Unit {
                status: UnitStatus::Occupied,
                ..unit
            },
            payments,
        })
    }
}
