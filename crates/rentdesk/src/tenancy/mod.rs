//! Request-scoped tenant context and the data-access scoping interceptor.
//!
//! The context rides a [`tokio::task_local!`] cell, so it follows the
//! logical request flow across await points rather than a worker thread.
//! [`ScopedStore`] wraps any [`PropertyStore`] and fills in the missing
//! organization predicate on tenant-owned reads and writes; callers that
//! already scoped their filter are left alone, and calls made with no
//! context (the reconciliation sweeps) pass through unmodified.

use std::future::Future;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde_json::json;

use crate::domain::{
    AuditLog, Lease, LeaseId, LeaseStatus, Organization, OrganizationId, Payment, PaymentId,
    PaymentStatus, Property, PropertyId, Tenant, TenantId, Unit, UnitId, UnitStatus,
};
use crate::store::{PropertyStore, StoreError, StoreTransaction, TenantFilter};

tokio::task_local! {
    static CURRENT_TENANT: TenantContext;
}

/// Ephemeral, request-lifetime holder of the caller's organization.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub organization: OrganizationId,
}

/// Runs `operation` with the given organization as the ambient tenant.
///
/// Every call to [`current_organization`] made while the future is being
/// polled observes the same organization, including synchronous calls and
/// nested futures awaited inside it.
pub async fn with_tenant<F>(organization: OrganizationId, operation: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT
        .scope(TenantContext { organization }, operation)
        .await
}

/// The ambient organization, if a tenant scope is active on this task.
pub fn current_organization() -> Option<OrganizationId> {
    CURRENT_TENANT
        .try_with(|context| context.organization.clone())
        .ok()
}

/// Defense-in-depth scoping decorator around a store.
///
/// Service-layer filters take precedence; the decorator only injects when
/// the caller supplied no organization predicate at all.
pub struct ScopedStore<S> {
    inner: Arc<S>,
}

impl<S> ScopedStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self { inner }
    }
}

fn scoped(filter: &TenantFilter) -> TenantFilter {
    if filter.organization.is_some() {
        return filter.clone();
    }
    TenantFilter {
        organization: current_organization(),
    }
}

impl<S: PropertyStore> PropertyStore for ScopedStore<S> {
    fn insert_organization(&self, organization: Organization) -> Result<(), StoreError> {
        self.inner.insert_organization(organization)
    }

    fn insert_property(&self, property: Property) -> Result<(), StoreError> {
        self.inner.insert_property(property)
    }

    fn insert_unit(&self, unit: Unit) -> Result<(), StoreError> {
        self.inner.insert_unit(unit)
    }

    fn insert_tenant(&self, tenant: Tenant) -> Result<(), StoreError> {
        self.inner.insert_tenant(tenant)
    }

    fn insert_lease(&self, lease: Lease) -> Result<(), StoreError> {
        self.inner.insert_lease(lease)
    }

    fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>, StoreError> {
        // The tenant root itself is exempt from scoping.
        self.inner.organization(id)
    }

    fn property(
        &self,
        id: &PropertyId,
        filter: &TenantFilter,
    ) -> Result<Option<Property>, StoreError> {
        self.inner.property(id, &scoped(filter))
    }

    fn unit(&self, id: &UnitId, filter: &TenantFilter) -> Result<Option<Unit>, StoreError> {
        self.inner.unit(id, &scoped(filter))
    }

    fn tenant(&self, id: &TenantId, filter: &TenantFilter) -> Result<Option<Tenant>, StoreError> {
        self.inner.tenant(id, &scoped(filter))
    }

    fn lease(&self, id: &LeaseId, filter: &TenantFilter) -> Result<Option<Lease>, StoreError> {
        self.inner.lease(id, &scoped(filter))
    }

    fn payment(
        &self,
        id: &PaymentId,
        filter: &TenantFilter,
    ) -> Result<Option<Payment>, StoreError> {
        self.inner.payment(id, &scoped(filter))
    }

    fn payments_for_lease(
        &self,
        lease: &LeaseId,
        filter: &TenantFilter,
    ) -> Result<Vec<Payment>, StoreError> {
        self.inner.payments_for_lease(lease, &scoped(filter))
    }

    fn transaction(&self) -> Result<Box<dyn StoreTransaction + '_>, StoreError> {
        Ok(Box::new(ScopedTransaction {
            inner: self.inner.transaction()?,
        }))
    }

    fn expire_leases_ended_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        self.inner.expire_leases_ended_before(cutoff)
    }

    fn flag_payments_due_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        self.inner.flag_payments_due_before(cutoff)
    }

    fn append_audit(&self, entry: AuditLog) -> Result<(), StoreError> {
        self.inner.append_audit(entry)
    }

    fn audit_entries(&self, filter: &TenantFilter) -> Result<Vec<AuditLog>, StoreError> {
        self.inner.audit_entries(&scoped(filter))
    }
}

/// Organization id asserted by the identity layer and forwarded with each
/// request. Requests without it never reach a tenant-owned collection.
pub struct OrganizationHeader(pub OrganizationId);

pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const ACTOR_HEADER: &str = "x-user-id";

#[axum::async_trait]
impl<S> FromRequestParts<S> for OrganizationHeader
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());

        match value {
            Some(value) => Ok(Self(OrganizationId(value.to_string()))),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": {
                        "kind": "MISSING_ORGANIZATION",
                        "message": format!("{ORGANIZATION_HEADER} header is required"),
                    }
                })),
            )),
        }
    }
}

/// Optional principal identifier used for audit attribution.
pub struct ActorHeader(pub Option<String>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ActorHeader
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Self(value))
    }
}

struct ScopedTransaction<'a> {
    inner: Box<dyn StoreTransaction + 'a>,
}

impl StoreTransaction for ScopedTransaction<'_> {
    fn transition_lease(
        &mut self,
        id: &LeaseId,
        filter: &TenantFilter,
        expected: LeaseStatus,
        next: LeaseStatus,
    ) -> Result<u64, StoreError> {
        self.inner
            .transition_lease(id, &scoped(filter), expected, next)
    }

    fn transition_payment(
        &mut self,
        id: &PaymentId,
        filter: &TenantFilter,
        expected: &[PaymentStatus],
        next: PaymentStatus,
        paid_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<u64, StoreError> {
        self.inner
            .transition_payment(id, &scoped(filter), expected, next, paid_at)
    }

    fn set_unit_status(
        &mut self,
        id: &UnitId,
        filter: &TenantFilter,
        next: UnitStatus,
    ) -> Result<u64, StoreError> {
        self.inner.set_unit_status(id, &scoped(filter), next)
    }

    fn insert_payment(&mut self, payment: Payment) -> Result<(), StoreError> {
        self.inner.insert_payment(payment)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit()
    }
}
