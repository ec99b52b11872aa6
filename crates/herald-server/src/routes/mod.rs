//! Route definitions for the REST API.

mod audit;
mod events;
mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route("/healthz/live", get(health::live))
        .route("/healthz/ready", get(health::ready))
        // Ingestion
        .route("/api/v1/events", post(events::post_events))
        // Audit
        .route("/audit/:user_id", get(audit::get_user_audit))
        // Attach state
        .with_state(state)
}

pub use audit::*;
pub use events::*;
pub use health::*;
