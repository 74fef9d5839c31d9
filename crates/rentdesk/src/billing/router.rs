use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::service::{SettlementError, SettlementService};
use crate::audit::AuditSink;
use crate::domain::PaymentId;
use crate::store::{PropertyStore, StoreError};
use crate::tenancy::{with_tenant, ActorHeader, OrganizationHeader};

/// Router builder exposing payment settlement.
pub fn payment_router<S, A>(service: Arc<SettlementService<S, A>>) -> Router
where
    S: PropertyStore + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/payments/:payment_id/mark-paid",
            post(mark_paid_handler::<S, A>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MarkPaidRequest {
    #[serde(default)]
    pub(crate) paid_at: Option<DateTime<Utc>>,
}

pub(crate) async fn mark_paid_handler<S, A>(
    State(service): State<Arc<SettlementService<S, A>>>,
    OrganizationHeader(organization): OrganizationHeader,
    ActorHeader(actor): ActorHeader,
    Path(payment_id): Path<String>,
    body: Option<axum::Json<MarkPaidRequest>>,
) -> Response
where
    S: PropertyStore + 'static,
    A: AuditSink + 'static,
{
    let payment_id = PaymentId(payment_id);
    let paid_at = body.map(|axum::Json(request)| request.paid_at).flatten();

    let outcome = with_tenant(organization.clone(), async {
        service.mark_paid(&payment_id, &organization, paid_at, actor.as_deref())
    })
    .await;

    match outcome {
        Ok(payment) => (StatusCode::OK, axum::Json(payment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: SettlementError) -> Response {
    let (status, kind) = match &error {
        SettlementError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        SettlementError::Conflict(conflict) => (StatusCode::CONFLICT, conflict.kind().code()),
        SettlementError::Store(StoreError::Conflict) => (StatusCode::CONFLICT, "STORE_CONFLICT"),
        SettlementError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_UNAVAILABLE"),
    };
    let payload = json!({
        "error": {
            "kind": kind,
            "message": error.to_string(),
        }
    });
    (status, axum::Json(payload)).into_response()
}
