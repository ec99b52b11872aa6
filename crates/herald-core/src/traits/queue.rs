//! Hand-off of ingested events to asynchronous processing.

use async_trait::async_trait;

use crate::error::HeraldResult;
use crate::types::Event;

/// Queue that schedules trigger processing for accepted events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventQueue: Send + Sync {
    async fn events_received(&self, events: &[Event]) -> HeraldResult<()>;
}
