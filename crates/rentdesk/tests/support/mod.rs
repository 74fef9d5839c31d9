//! Shared fixtures for the lifecycle integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;

use rentdesk::audit::StoreAuditSink;
use rentdesk::billing::{RepeatSettlementPolicy, SettlementService};
use rentdesk::domain::{
    BillCycle, Lease, Organization, OrganizationId, Property, PropertyId, Tenant, TenantId, Unit,
    UnitId, UnitStatus,
};
use rentdesk::leasing::{LeaseDraft, LeaseService};
use rentdesk::reconciliation::ReconciliationSweeper;
use rentdesk::store::memory::MemoryStore;
use rentdesk::store::PropertyStore;

pub type Leases = LeaseService<MemoryStore, StoreAuditSink<MemoryStore>>;
pub type Settlements = SettlementService<MemoryStore, StoreAuditSink<MemoryStore>>;

pub struct Core {
    pub store: Arc<MemoryStore>,
    pub leases: Arc<Leases>,
    pub sweeper: ReconciliationSweeper<MemoryStore>,
}

pub fn build_core() -> Core {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(StoreAuditSink::new(store.clone()));
    Core {
        leases: Arc::new(LeaseService::new(store.clone(), audit)),
        sweeper: ReconciliationSweeper::new(store.clone()),
        store,
    }
}

pub fn settlements(core: &Core, policy: RepeatSettlementPolicy) -> Arc<Settlements> {
    let audit = Arc::new(StoreAuditSink::new(core.store.clone()));
    Arc::new(SettlementService::new(core.store.clone(), audit, policy))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Seeds an organization with one property, one vacant unit, and one
/// tenant; every id carries the organization name.
pub fn seed_portfolio(store: &MemoryStore, organization: &str) -> (PropertyId, UnitId, TenantId) {
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
            status: UnitStatus::Vacant,
        })
        .expect("seed unit");

    let tenant_id = TenantId(format!("tenant-{organization}"));
    store
        .insert_tenant(Tenant {
            id: tenant_id.clone(),
            organization_id: org,
            full_name: "Jordan Avery".to_string(),
            email: format!("jordan@{organization}.example.com"),
            phone: format!("515-555-0{:03}", organization.len()),
        })
        .expect("seed tenant");

    (property_id, unit_id, tenant_id)
}

/// Drafts a pending lease over the portfolio seeded for `organization`.
pub fn pending_lease(
    core: &Core,
    organization: &str,
    rent_amount: u32,
    deposit_amount: Option<u32>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Lease {
    let (property_id, unit_id, tenant_id) = seed_portfolio(&core.store, organization);
    core.leases
        .create(LeaseDraft {
            organization: OrganizationId::from(organization),
            property_id,
            unit_id,
            tenant_id,
            start_date,
            end_date,
            rent_amount,
            deposit_amount,
            bill_cycle: BillCycle::Monthly,
        })
        .expect("pending lease")
}
