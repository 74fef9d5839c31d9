//! Best-effort audit trail. A failed audit write degrades observability
//! and nothing else; business state is already committed by the time an
//! event reaches the sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::domain::{AuditAction, AuditLog, EntityKind, OrganizationId};
use crate::store::{PropertyStore, StoreError};

/// Fact describing who did what to which entity.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub organization: OrganizationId,
    pub user_id: Option<String>,
    pub entity: EntityKind,
    pub entity_id: String,
    pub action: AuditAction,
    pub metadata: Option<serde_json::Value>,
}

/// Audit dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Outbound audit hook. Implementations must not block on unbounded work.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Records an event and swallows any failure at warning level. This is the
/// single dispatch point used by the lifecycle services.
pub fn record_best_effort<A: AuditSink + ?Sized>(sink: &A, event: AuditEvent) {
    let action = event.action.code();
    if let Err(err) = sink.record(event) {
        warn!(error = %err, action, "audit sink rejected event");
    }
}

static AUDIT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_audit_id() -> String {
    let id = AUDIT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("audit-{id:06}")
}

/// Sink that appends facts to the shared store's audit log.
pub struct StoreAuditSink<S> {
    store: Arc<S>,
}

impl<S> StoreAuditSink<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: PropertyStore> AuditSink for StoreAuditSink<S> {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let entry = AuditLog {
            id: next_audit_id(),
            organization_id: event.organization,
            user_id: event.user_id,
            entity: event.entity,
            entity_id: event.entity_id,
            action: event.action,
            metadata: event.metadata,
            recorded_at: Utc::now(),
        };
        self.store.append_audit(entry).map_err(|err| match err {
            StoreError::Unavailable(reason) => AuditError::Unavailable(reason),
            other => AuditError::Unavailable(other.to_string()),
        })
    }
}
