//! Persistence contract for the lifecycle core.
//!
//! The store is deliberately narrow: typed reads behind a tenant filter,
//! conditional transitions that report how many rows they touched, and
//! set-based sweeps. Any backend that can run "update rows matching a
//! predicate and return the count" inside a transaction satisfies it; the
//! bundled [`memory::MemoryStore`] keeps everything behind one mutex.

pub mod memory;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    AuditLog, Lease, LeaseId, LeaseStatus, Organization, OrganizationId, Payment, PaymentId,
    PaymentStatus, Property, PropertyId, Tenant, TenantId, Unit, UnitId, UnitStatus,
};

/// Predicate applied to reads and writes against tenant-owned collections.
///
/// A filter without an organization matches every row; the scoping
/// interceptor fills the gap from the ambient tenant context when one is
/// active. An explicit organization always wins and is never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantFilter {
    pub organization: Option<OrganizationId>,
}

impl TenantFilter {
    pub fn for_organization(organization: OrganizationId) -> Self {
        Self {
            organization: Some(organization),
        }
    }

    /// Explicitly unscoped; used by flows that intentionally span tenants.
    pub fn unscoped() -> Self {
        Self::default()
    }

    pub fn matches(&self, organization: &OrganizationId) -> bool {
        match &self.organization {
            Some(scoped) => scoped == organization,
            None => true,
        }
    }
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction so the lifecycle services can be exercised in
/// isolation. All methods are individually atomic; multi-row work goes
/// through [`PropertyStore::transaction`].
pub trait PropertyStore: Send + Sync {
    fn insert_organization(&self, organization: Organization) -> Result<(), StoreError>;
    fn insert_property(&self, property: Property) -> Result<(), StoreError>;
    fn insert_unit(&self, unit: Unit) -> Result<(), StoreError>;
    fn insert_tenant(&self, tenant: Tenant) -> Result<(), StoreError>;
    fn insert_lease(&self, lease: Lease) -> Result<(), StoreError>;

    /// Organizations are the tenant root and are never tenant-filtered.
    fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>, StoreError>;
    fn property(
        &self,
        id: &PropertyId,
        filter: &TenantFilter,
    ) -> Result<Option<Property>, StoreError>;
    fn unit(&self, id: &UnitId, filter: &TenantFilter) -> Result<Option<Unit>, StoreError>;
    fn tenant(&self, id: &TenantId, filter: &TenantFilter) -> Result<Option<Tenant>, StoreError>;
    fn lease(&self, id: &LeaseId, filter: &TenantFilter) -> Result<Option<Lease>, StoreError>;
    fn payment(
        &self,
        id: &PaymentId,
        filter: &TenantFilter,
    ) -> Result<Option<Payment>, StoreError>;
    fn payments_for_lease(
        &self,
        lease: &LeaseId,
        filter: &TenantFilter,
    ) -> Result<Vec<Payment>, StoreError>;

    /// Opens a transaction. Statements apply immediately within the session;
    /// dropping the session without calling commit rolls every one back.
    fn transaction(&self) -> Result<Box<dyn StoreTransaction + '_>, StoreError>;

    /// Set-based sweep: every active lease whose end date lies strictly
    /// before the cutoff becomes expired. Returns the number of rows moved.
    fn expire_leases_ended_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError>;

    /// Set-based sweep: every pending payment due strictly before the cutoff
    /// becomes overdue. Returns the number of rows moved.
    fn flag_payments_due_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError>;

    fn append_audit(&self, entry: AuditLog) -> Result<(), StoreError>;
    fn audit_entries(&self, filter: &TenantFilter) -> Result<Vec<AuditLog>, StoreError>;
}

/// One atomic unit of work. The conditional transitions return the number
/// of rows affected (0 or 1); a zero tells the caller it lost the race or
/// the row left the expected state, and nothing was written.
pub trait StoreTransaction {
    fn transition_lease(
        &mut self,
        id: &LeaseId,
        filter: &TenantFilter,
        expected: LeaseStatus,
        next: LeaseStatus,
    ) -> Result<u64, StoreError>;

    fn transition_payment(
        &mut self,
        id: &PaymentId,
        filter: &TenantFilter,
        expected: &[PaymentStatus],
        next: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError>;

    fn set_unit_status(
        &mut self,
        id: &UnitId,
        filter: &TenantFilter,
        next: UnitStatus,
    ) -> Result<u64, StoreError>;

    fn insert_payment(&mut self, payment: Payment) -> Result<(), StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
