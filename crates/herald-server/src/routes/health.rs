//! Liveness and readiness probes.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Liveness probe.
/// GET /healthz/live
pub async fn live() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Readiness probe; 503 while storage is unreachable.
/// GET /healthz/ready
pub async fn ready(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.check_ready().await.map_err(|err| {
        warn!(error = %err, "Readiness check failed");
        ApiError::unavailable(err.to_string())
    })?;

    Ok(Json(HealthResponse { ok: true }))
}
