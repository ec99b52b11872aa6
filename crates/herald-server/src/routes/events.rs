//! Event ingestion endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct PostEventsResponse {
    pub accepted: usize,
}

/// Accept a batch of events; invalid items are dropped.
/// POST /api/v1/events
pub async fn post_events(
    State(state): State<AppState>,
    Json(items): Json<Vec<serde_json::Value>>,
) -> ApiResult<(StatusCode, Json<PostEventsResponse>)> {
    let outcome = state.ingestor().ingest(items).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PostEventsResponse {
            accepted: outcome.accepted,
        }),
    ))
}
