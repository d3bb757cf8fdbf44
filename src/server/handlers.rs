//! Route handlers

use crate::driver::definition::{validate_id, ResourceDefinition};
use crate::driver::error::DriverError;
use crate::driver::response::ResourceEnvelope;
use crate::observability::metrics;
use crate::provider::DeleteOutcome;
use crate::server::error::ErrorBody;
use crate::server::headers::decode_delete_headers;
use crate::server::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use std::sync::atomic::Ordering;
use tracing::info;

/// `POST /`
pub async fn create_resource(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ResourceEnvelope>, DriverError> {
    let result = create(&state, &body).await;
    metrics::record_request("create", outcome(&result));
    result.map(Json)
}

async fn create(state: &AppState, body: &[u8]) -> Result<ResourceEnvelope, DriverError> {
    let definition = ResourceDefinition::from_slice(body)?;
    info!(
        resource.id = %definition.id,
        resource.kind = definition.resource_type().as_str(),
        "Create requested"
    );
    let resource = state.engine.create(definition).await?;
    info!(
        resource.id = %resource.id,
        resource.name = resource.name(),
        resolution = resource.resolution.as_str(),
        "Resource ready"
    );
    Ok(ResourceEnvelope::from(&resource))
}

/// `DELETE /{id}`
///
/// `id` is only checked and logged; the resource is identified by the headers.
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, DriverError> {
    let result = delete(&state, &id, &headers).await;
    metrics::record_request("delete", outcome(&result));
    result.map(|_| StatusCode::NO_CONTENT)
}

async fn delete(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
) -> Result<DeleteOutcome, DriverError> {
    validate_id(id).map_err(|_| DriverError::NotFound(format!("\"{id}\"")))?;
    info!(resource.id = %id, "Delete requested");
    let request = decode_delete_headers(headers, state.engine.identity_deriver())?;
    state
        .engine
        .delete(request.driver_params, request.credentials)
        .await
}

fn outcome<T>(result: &Result<T, DriverError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.class(),
    }
}

/// `GET /alive`, `GET /health`, `GET /healthz`
pub async fn alive() -> impl IntoResponse {
    StatusCode::OK
}

/// `GET /readyz`
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// `GET /metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                format!("Failed to encode metrics: {e}").into_bytes(),
            )
        }
    }
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
}
