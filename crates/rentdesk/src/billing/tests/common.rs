use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::audit::{AuditError, AuditEvent, AuditSink};
use crate::billing::{RepeatSettlementPolicy, SettlementService};
use crate::domain::{
    LeaseId, OrganizationId, Payment, PaymentId, PaymentKind, PaymentStatus,
};
use crate::store::memory::MemoryStore;
use crate::store::{PropertyStore, StoreTransaction};

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

pub(super) fn instant(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().expect("valid instant")
}

/// Inserts a payment row in the given status for org-a.
pub(super) fn seed_payment(store: &MemoryStore, id: &str, status: PaymentStatus) -> PaymentId {
    let payment_id = PaymentId::from(id);
    let paid_at = match status {
        PaymentStatus::Paid => Some(instant(2026, 8, 1)),
        _ => None,
    };
    let mut tx = store.transaction().expect("open transaction");
    tx.insert_payment(Payment {
        id: payment_id.clone(),
        organization_id: OrganizationId::from("org-a"),
        lease_id: LeaseId::from("lease-000001"),
        kind: PaymentKind::Rent,
        status,
        amount: 1180,
        due_date: date(2026, 9, 1),
        paid_at,
    })
    .expect("seed payment");
    tx.commit().expect("commit");
    payment_id
}

pub(super) fn build_service(
    policy: RepeatSettlementPolicy,
) -> (
    SettlementService<MemoryStore, RecordingAuditSink>,
    Arc<MemoryStore>,
    Arc<RecordingAuditSink>,
) {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditSink::default());
    let service = SettlementService::new(store.clone(), audit.clone(), policy);
    (service, store, audit)
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
