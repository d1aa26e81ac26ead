//! Liveness, readiness, and version endpoints.
use crate::api::error::{ApiError, store_error};
use crate::api::types::{HealthStatus, VersionResponse};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/health/alive",
    tag = "system",
    responses(
        (status = 200, description = "Process is running", body = HealthStatus)
    )
)]
pub(crate) async fn health_alive() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "system",
    responses(
        (status = 200, description = "Store is reachable", body = HealthStatus),
        (status = 500, description = "Store is unavailable", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn health_ready(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    state
        .store
        .health_check()
        .await
        .map_err(|err| store_error("store readiness probe failed", err))?;
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/version",
    tag = "system",
    responses(
        (status = 200, description = "Service version", body = VersionResponse)
    )
)]
pub(crate) async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
