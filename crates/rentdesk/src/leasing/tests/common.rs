use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::audit::{AuditError, AuditEvent, AuditSink};
use crate::domain::{
    BillCycle, Lease, LeaseStatus, Organization, OrganizationId, Property, PropertyId, Tenant,
    TenantId, Unit, UnitId, UnitStatus,
};
use crate::leasing::{LeaseDraft, LeaseService};
use crate::store::memory::MemoryStore;
use crate::store::PropertyStore;

#[derive(Default)]
pub(super) struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub(super) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .expect("audit mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct RefusingAuditSink;

impl AuditSink for RefusingAuditSink {
    fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit pipeline offline".to_string()))
    }
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Seeds an organization with one property, one unit, and one tenant,
/// suffixing every id so multiple portfolios can coexist.
pub(super) fn seed_portfolio(
    store: &MemoryStore,
    organization: &str,
    unit_status: UnitStatus,
) -> (PropertyId, UnitId, TenantId) {
    let org = OrganizationId::from(organization);
    store
        .insert_organization(Organization {
            id: org.clone(),
            name: format!("{organization} Holdings"),
        })
        .expect("seed organization");

    let property_id = PropertyId(format!("prop-{organization}"));
    store
        .insert_property(Property {
            id: property_id.clone(),
            organization_id: org.clone(),
            name: "Riverfront Lofts".to_string(),
        })
        .expect("seed property");

    let unit_id = UnitId(format!("unit-{organization}"));
    store
        .insert_unit(Unit {
            id: unit_id.clone(),
            organization_id: org.clone(),
            property_id: property_id.clone(),
            label: "A-201".to_string(),
            status: unit_status,
        })
        .expect("seed unit");

    let tenant_id = TenantId(format!("tenant-{organization}"));
    store
        .insert_tenant(Tenant {
            id: tenant_id.clone(),
            organization_id: org,
            full_name: "Jordan Avery".to_string(),
            email: format!("jordan@{organization}.example.com"),
            phone: format!("515-555-01{:02}", organization.len()),
        })
        .expect("seed tenant");

    (property_id, unit_id, tenant_id)
}

pub(super) fn draft(
    organization: &str,
    property_id: &PropertyId,
    unit_id: &UnitId,
    tenant_id: &TenantId,
) -> LeaseDraft {
    LeaseDraft {
        organization: OrganizationId::from(organization),
        property_id: property_id.clone(),
        unit_id: unit_id.clone(),
        tenant_id: tenant_id.clone(),
        start_date: date(2026, 9, 1),
        end_date: Some(date(2027, 8, 31)),
        rent_amount: 1180,
        deposit_amount: Some(2100),
        bill_cycle: BillCycle::Monthly,
    }
}

pub(super) fn build_service() -> (
    LeaseService<MemoryStore, RecordingAuditSink>,
    Arc<MemoryStore>,
    Arc<RecordingAuditSink>,
) {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditSink::default());
    let service = LeaseService::new(store.clone(), audit.clone());
    (service, store, audit)
}

/// A portfolio plus a pending lease ready for activation.
pub(super) fn build_service_with_pending_lease() -> (
    LeaseService<MemoryStore, RecordingAuditSink>,
    Arc<MemoryStore>,
    Arc<RecordingAuditSink>,
    Lease,
) {
    let (service, store, audit) = build_service();
    let (property_id, unit_id, tenant_id) = seed_portfolio(&store, "org-a", UnitStatus::Vacant);
    let lease = service
        .create(draft("org-a", &property_id, &unit_id, &tenant_id))
        .expect("pending lease");
    assert_eq!(lease.status, LeaseStatus::Pending);
    (service, store, audit, lease)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn error_kind(payload: &Value) -> &str {
    payload
        .get("error")
        .and_then(|error| error.get("kind"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}
