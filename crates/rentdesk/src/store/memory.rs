//! Single-process store keeping every table behind one mutex.
//!
//! Transactions hold the lock for their whole lifetime, so statements are
//! trivially serialized; an undo log restores touched rows when a session
//! is dropped without commit.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use super::{PropertyStore, StoreError, StoreTransaction, TenantFilter};
use crate::domain::{
    AuditLog, Lease, LeaseId, LeaseStatus, Organization, OrganizationId, Payment, PaymentId,
    PaymentStatus, Property, PropertyId, Tenant, TenantId, Unit, UnitId, UnitStatus,
};

#[derive(Default)]
struct Tables {
    organizations: HashMap<OrganizationId, Organization>,
    properties: HashMap<PropertyId, Property>,
    units: HashMap<UnitId, Unit>,
    tenants: HashMap<TenantId, Tenant>,
    leases: HashMap<LeaseId, Lease>,
    payments: HashMap<PaymentId, Payment>,
    audit_log: Vec<AuditLog>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("store mutex poisoned")
    }
}

impl PropertyStore for MemoryStore {
    fn insert_organization(&self, organization: Organization) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.organizations.contains_key(&organization.id) {
            return Err(StoreError::Conflict);
        }
        tables
            .organizations
            .insert(organization.id.clone(), organization);
        Ok(())
    }

    fn insert_property(&self, property: Property) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.properties.contains_key(&property.id) {
            return Err(StoreError::Conflict);
        }
        tables.properties.insert(property.id.clone(), property);
        Ok(())
    }

    fn insert_unit(&self, unit: Unit) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.units.contains_key(&unit.id) {
            return Err(StoreError::Conflict);
        }
        tables.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    fn insert_tenant(&self, tenant: Tenant) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.tenants.contains_key(&tenant.id) {
            return Err(StoreError::Conflict);
        }
        // Email and phone are unique within an organization.
        let duplicate = tables.tenants.values().any(|existing| {
            existing.organization_id == tenant.organization_id
                && (existing.email == tenant.email || existing.phone == tenant.phone)
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }
        tables.tenants.insert(tenant.id.clone(), tenant);
        Ok(())
    }

    fn insert_lease(&self, lease: Lease) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.leases.contains_key(&lease.id) {
            return Err(StoreError::Conflict);
        }
        tables.leases.insert(lease.id.clone(), lease);
        Ok(())
    }

    fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>, StoreError> {
        Ok(self.lock().organizations.get(id).cloned())
    }

    fn property(
        &self,
        id: &PropertyId,
        filter: &TenantFilter,
    ) -> Result<Option<Property>, StoreError> {
        Ok(self
            .lock()
            .properties
            .get(id)
            .filter(|row| filter.matches(&row.organization_id))
            .cloned())
    }

    fn unit(&self, id: &UnitId, filter: &TenantFilter) -> Result<Option<Unit>, StoreError> {
        Ok(self
            .lock()
            .units
            .get(id)
            .filter(|row| filter.matches(&row.organization_id))
            .cloned())
    }

    fn tenant(&self, id: &TenantId, filter: &TenantFilter) -> Result<Option<Tenant>, StoreError> {
        Ok(self
            .lock()
            .tenants
            .get(id)
            .filter(|row| filter.matches(&row.organization_id))
            .cloned())
    }

    fn lease(&self, id: &LeaseId, filter: &TenantFilter) -> Result<Option<Lease>, StoreError> {
        Ok(self
            .lock()
            .leases
            .get(id)
            .filter(|row| filter.matches(&row.organization_id))
            .cloned())
    }

    fn payment(
        &self,
        id: &PaymentId,
        filter: &TenantFilter,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .lock()
            .payments
            .get(id)
            .filter(|row| filter.matches(&row.organization_id))
            .cloned())
    }

    fn payments_for_lease(
        &self,
        lease: &LeaseId,
        filter: &TenantFilter,
    ) -> Result<Vec<Payment>, StoreError> {
        let tables = self.lock();
        let mut rows: Vec<Payment> = tables
            .payments
            .values()
            .filter(|row| &row.lease_id == lease && filter.matches(&row.organization_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(rows)
    }

    fn transaction(&self) -> Result<Box<dyn StoreTransaction + '_>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            tables: self.lock(),
            undo: Vec::new(),
            committed: false,
        }))
    }

    fn expire_leases_ended_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let mut moved = 0;
        for lease in tables.leases.values_mut() {
            let ended = lease.end_date.map_or(false, |end| end < cutoff);
            if lease.status == LeaseStatus::Active && ended {
                lease.status = LeaseStatus::Expired;
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn flag_payments_due_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let mut moved = 0;
        for payment in tables.payments.values_mut() {
            if payment.status == PaymentStatus::Pending && payment.due_date < cutoff {
                payment.status = PaymentStatus::Overdue;
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn append_audit(&self, entry: AuditLog) -> Result<(), StoreError> {
        self.lock().audit_log.push(entry);
        Ok(())
    }

    fn audit_entries(&self, filter: &TenantFilter) -> Result<Vec<AuditLog>, StoreError> {
        Ok(self
            .lock()
            .audit_log
            .iter()
            .filter(|row| filter.matches(&row.organization_id))
            .cloned()
            .collect())
    }
}

enum Undo {
    LeaseStatus(LeaseId, LeaseStatus),
    PaymentStatus(PaymentId, PaymentStatus, Option<DateTime<Utc>>),
    UnitStatus(UnitId, UnitStatus),
    PaymentInsert(PaymentId),
}

struct MemoryTransaction<'a> {
    tables: MutexGuard<'a, Tables>,
    undo: Vec<Undo>,
    committed: bool,
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn transition_lease(
        &mut self,
        id: &LeaseId,
        filter: &TenantFilter,
        expected: LeaseStatus,
        next: LeaseStatus,
    ) -> Result<u64, StoreError> {
        match self.tables.leases.get_mut(id) {
            Some(lease)
                if filter.matches(&lease.organization_id) && lease.status == expected =>
            {
                self.undo.push(Undo::LeaseStatus(id.clone(), lease.status));
                lease.status = next;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn transition_payment(
        &mut self,
        id: &PaymentId,
        filter: &TenantFilter,
        expected: &[PaymentStatus],
        next: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError> {
        match self.tables.payments.get_mut(id) {
            Some(payment)
                if filter.matches(&payment.organization_id)
                    && expected.contains(&payment.status) =>
            {
                self.undo.push(Undo::PaymentStatus(
                    id.clone(),
                    payment.status,
                    payment.paid_at,
                ));
                payment.status = next;
                if next == PaymentStatus::Paid {
                    payment.paid_at = paid_at;
                }
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn set_unit_status(
        &mut self,
        id: &UnitId,
        filter: &TenantFilter,
        next: UnitStatus,
    ) -> Result<u64, StoreError> {
        match self.tables.units.get_mut(id) {
            Some(unit) if filter.matches(&unit.organization_id) => {
                self.undo.push(Undo::UnitStatus(id.clone(), unit.status));
                unit.status = next;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn insert_payment(&mut self, payment: Payment) -> Result<(), StoreError> {
        if self.tables.payments.contains_key(&payment.id) {
            return Err(StoreError::Conflict);
        }
        self.undo.push(Undo::PaymentInsert(payment.id.clone()));
        self.tables.payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.committed = true;
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Unwind in reverse so rows touched twice land on their first value.
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::LeaseStatus(id, status) => {
                    if let Some(lease) = self.tables.leases.get_mut(&id) {
                        lease.status = status;
                    }
                }
                Undo::PaymentStatus(id, status, paid_at) => {
                    if let Some(payment) = self.tables.payments.get_mut(&id) {
                        payment.status = status;
                        payment.paid_at = paid_at;
                    }
                }
                Undo::UnitStatus(id, status) => {
                    if let Some(unit) = self.tables.units.get_mut(&id) {
                        unit.status = status;
                    }
                }
                Undo::PaymentInsert(id) => {
                    self.tables.payments.remove(&id);
                }
            }
        }
    }
}
