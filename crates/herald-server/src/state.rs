//! Server state management.

use std::sync::Arc;

use herald_core::error::HeraldResult;
use herald_core::traits::StorageHealth;
use herald_core::{EventIngestor, UserAuditService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub ingestor: EventIngestor,
    pub audit: UserAuditService,
    /// Backends probed by the readiness endpoint
    pub storage: Vec<Arc<dyn StorageHealth>>,
    pub audit_default_limit: usize,
}

impl AppState {
    pub fn new(
        ingestor: EventIngestor,
        audit: UserAuditService,
        storage: Vec<Arc<dyn StorageHealth>>,
        audit_default_limit: usize,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                ingestor,
                audit,
                storage,
                audit_default_limit,
            }),
        }
    }

    pub fn ingestor(&self) -> &EventIngestor {
        &self.inner.ingestor
    }

    pub fn audit(&self) -> &UserAuditService {
        &self.inner.audit
    }

    pub fn audit_default_limit(&self) -> usize {
        self.inner.audit_default_limit
    }

    /// Ping every storage backend, failing on the first error.
    pub async fn check_ready(&self) -> HeraldResult<()> {
        for backend in &self.inner.storage {
            backend.ping().await?;
        }
        Ok(())
    }
}
