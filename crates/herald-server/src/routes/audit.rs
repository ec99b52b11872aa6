//! Per-user audit endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use herald_core::UserAudit;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Recent events and notification decisions of a user.
/// GET /audit/:user_id
pub async fn get_user_audit(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<UserAudit>> {
    let limit = query.limit.unwrap_or_else(|| state.audit_default_limit());
    let audit = state.audit().audit(&user_id, limit).await?;
    Ok(Json(audit))
}
