use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::service::{LeaseDraft, LeaseService, LeasingError};
use crate::audit::AuditSink;
use crate::domain::{BillCycle, LeaseId, PropertyId, TenantId, UnitId};
use crate::store::{PropertyStore, StoreError};
use crate::tenancy::{with_tenant, ActorHeader, OrganizationHeader};

/// Router builder exposing lease drafting and activation.
pub fn lease_router<S, A>(service: Arc<LeaseService<S, A>>) -> Router
where
    S: PropertyStore + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route("/api/v1/leases", post(create_handler::<S, A>))
        .route(
            "/api/v1/leases/:lease_id/activate",
            post(activate_handler::<S, A>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateLeaseRequest {
    pub(crate) property_id: String,
    pub(crate) unit_id: String,
    pub(crate) tenant_id: String,
    pub(crate) start_date: NaiveDate,
    #[serde(default)]
    pub(crate) end_date: Option<NaiveDate>,
    pub(crate) rent_amount: u32,
    #[serde(default)]
    pub(crate) deposit_amount: Option<u32>,
    pub(crate) bill_cycle: BillCycle,
}

pub(crate) async fn create_handler<S, A>(
    State(service): State<Arc<LeaseService<S, A>>>,
    OrganizationHeader(organization): OrganizationHeader,
    axum::Json(request): axum::Json<CreateLeaseRequest>,
) -> Response
where
    S: PropertyStore + 'static,
    A: AuditSink + 'static,
{
    let draft = LeaseDraft {
        organization: organization.clone(),
        property_id: PropertyId(request.property_id),
        unit_id: UnitId(request.unit_id),
        tenant_id: TenantId(request.tenant_id),
        start_date: request.start_date,
        end_date: request.end_date,
        rent_amount: request.rent_amount,
        deposit_amount: request.deposit_amount,
        bill_cycle: request.bill_cycle,
    };

    let outcome = with_tenant(organization, async { service.create(draft) }).await;
    match outcome {
        Ok(lease) => (StatusCode::CREATED, axum::Json(lease)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn activate_handler<S, A>(
    State(service): State<Arc<LeaseService<S, A>>>,
    OrganizationHeader(organization): OrganizationHeader,
    ActorHeader(actor): ActorHeader,
    Path(lease_id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
    A: AuditSink + 'static,
{
    let lease_id = LeaseId(lease_id);
    let outcome = with_tenant(organization.clone(), async {
        service.activate(&lease_id, &organization, actor.as_deref())
    })
    .await;

    match outcome {
        Ok(activation) => (StatusCode::OK, axum::Json(activation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: LeasingError) -> Response {
    let (status, kind) = match &error {
        LeasingError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        LeasingError::Conflict(conflict) => (StatusCode::CONFLICT, conflict.kind().code()),
        LeasingError::InvalidRelation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_RELATION"),
        LeasingError::Store(StoreError::Conflict) => (StatusCode::CONFLICT, "STORE_CONFLICT"),
        LeasingError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_UNAVAILABLE"),
    };
    let payload = json!({
        "error": {
            "kind": kind,
            "message": error.to_string(),
        }
    });
    (status, axum::Json(payload)).into_response()
}
