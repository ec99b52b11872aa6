//! herald-server - REST API server for herald.
//!
//! Accepts event batches, runs the trigger worker in the background and
//! serves per-user audit trails.
//!
//! # Example
//!
//! ```ignore
//! use herald_core::HeraldConfig;
//! use herald_server::{bootstrap, create_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (state, _worker) = bootstrap(&HeraldConfig::from_env()).unwrap();
//!     let app = create_server(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use std::sync::Arc;

use axum::{middleware as axum_middleware, Router};
use herald_core::traits::StorageHealth;
use herald_core::{
    spawn_trigger_worker, EventDispatcher, EventIngestor, HeraldConfig, HeraldError,
    SqliteEventStore, SqliteNotificationHistoryStore, StaticNotificationCatalog, StaticRuleCatalog,
    TriggerNotifications, UserAuditService,
};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Herald(#[from] HeraldError),

    #[error("invalid bind address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open storage, load catalogs and start the trigger worker.
///
/// Returns the server state and the worker handle. The worker stops once
/// the returned state (which owns the dispatcher) is dropped.
pub fn bootstrap(config: &HeraldConfig) -> Result<(AppState, JoinHandle<()>), ServerError> {
    config.validate()?;

    let rules = Arc::new(StaticRuleCatalog::from_file(&config.rules_path)?);
    let notifications = Arc::new(StaticNotificationCatalog::from_file(&config.notifications_path)?);
    let events = Arc::new(SqliteEventStore::new(&config.database_path)?);
    let history = Arc::new(SqliteNotificationHistoryStore::new(&config.database_path)?);
    info!(database = %config.database_path.display(), "Storage opened");

    let trigger = TriggerNotifications::new(
        rules,
        notifications,
        events.clone(),
        history.clone(),
        history.clone(),
    )
    .with_failure_policy(config.rule_failure_policy);

    let (dispatcher, receiver) = EventDispatcher::new(config.queue_capacity);
    let worker = spawn_trigger_worker(trigger, receiver);

    let storage: Vec<Arc<dyn StorageHealth>> = vec![
        events.clone() as Arc<dyn StorageHealth>,
        history.clone() as Arc<dyn StorageHealth>,
    ];
    let state = AppState::new(
        EventIngestor::new(events.clone(), Arc::new(dispatcher)),
        UserAuditService::new(events, history),
        storage,
        config.audit_default_limit,
    );

    Ok((state, worker))
}

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(axum_middleware::from_fn(middleware::logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(middleware::cors_layer())
            .layer(middleware::compression_layer()),
    )
}
