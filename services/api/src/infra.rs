use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rentdesk::audit::StoreAuditSink;
use rentdesk::billing::{RepeatSettlementPolicy, SettlementService};
use rentdesk::domain::{
    Organization, OrganizationId, Property, PropertyId, Tenant, TenantId, Unit, UnitId, UnitStatus,
};
use rentdesk::leasing::LeaseService;
use rentdesk::reconciliation::ReconciliationSweeper;
use rentdesk::store::memory::MemoryStore;
use rentdesk::store::{PropertyStore, StoreError};
use rentdesk::tenancy::ScopedStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every data-access path in the service goes through the scoping
/// interceptor; the raw store never leaves this module.
pub(crate) type SharedStore = ScopedStore<MemoryStore>;

pub(crate) struct CoreServices {
    pub(crate) store: Arc<SharedStore>,
    pub(crate) leases: Arc<LeaseService<SharedStore, StoreAuditSink<SharedStore>>>,
    pub(crate) settlements: Arc<SettlementService<SharedStore, StoreAuditSink<SharedStore>>>,
    pub(crate) sweeper: Arc<ReconciliationSweeper<SharedStore>>,
}

pub(crate) fn build_core(repeat_settlement: RepeatSettlementPolicy) -> CoreServices {
    let store = Arc::new(ScopedStore::new(Arc::new(MemoryStore::new())));
    let audit = Arc::new(StoreAuditSink::new(store.clone()));
    CoreServices {
        leases: Arc::new(LeaseService::new(store.clone(), audit.clone())),
        settlements: Arc::new(SettlementService::new(
            store.clone(),
            audit,
            repeat_settlement,
        )),
        sweeper: Arc::new(ReconciliationSweeper::new(store.clone())),
        store,
    }
}

/// Ids of the demo portfolio seeded by `--demo-seed` and the demo command.
pub(crate) struct DemoPortfolio {
    pub(crate) organization: OrganizationId,
    pub(crate) property_id: PropertyId,
    pub(crate) unit_id: UnitId,
    pub(crate) tenant_id: TenantId,
}

pub(crate) fn seed_demo_portfolio<S: PropertyStore>(
    store: &S,
) -> Result<DemoPortfolio, StoreError> {
    let organization = OrganizationId::from("org-demo");
    store.insert_organization(Organization {
        id: organization.clone(),
        name: "Demo Holdings".to_string(),
    })?;

    let property_id = PropertyId::from("prop-demo");
    store.insert_property(Property {
        id: property_id.clone(),
        organization_id: organization.clone(),
        name: "Riverfront Lofts".to_string(),
    })?;

    let unit_id = UnitId::from("unit-demo");
    store.insert_unit(Unit {
        id: unit_id.clone(),
        organization_id: organization.clone(),
        property_id: property_id.clone(),
        label: "A-201".to_string(),
        status: UnitStatus::Vacant,
    })?;

    let tenant_id = TenantId::from("tenant-demo");
    store.insert_tenant(Tenant {
        id: tenant_id.clone(),
        organization_id: organization.clone(),
        full_name: "Jordan Avery".to_string(),
        email: "jordan@example.com".to_string(),
        phone: "515-555-0100".to_string(),
    })?;

    Ok(DemoPortfolio {
        organization,
        property_id,
        unit_id,
        tenant_id,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
