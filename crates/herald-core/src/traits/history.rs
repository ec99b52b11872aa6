//! Read/write access to historical events and notification records.

use async_trait::async_trait;
use chrono::Duration;

use crate::error::HeraldResult;
use crate::types::{Event, NotificationHistoryRecord};

/// Lookup of prior events, used by event proximity conditions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventHistoryReader: Send + Sync {
    /// Events of `event_type` for `user_id` that happened within `window` of now.
    async fn find_within_window(
        &self,
        event_type: &str,
        user_id: &str,
        window: Duration,
    ) -> HeraldResult<Vec<Event>>;
}

/// Counting of past notifications, used by the debounce policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationHistoryReader: Send + Sync {
    /// Number of `notification_type` records for `user_id` created within `window` of now.
    async fn count_within_window(
        &self,
        user_id: &str,
        notification_type: &str,
        window: Duration,
    ) -> HeraldResult<u64>;
}

/// Persistence of notification decisions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationHistoryWriter: Send + Sync {
    async fn save(&self, record: &NotificationHistoryRecord) -> HeraldResult<()>;
}

/// Persistence of ingested events.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    /// Save a batch, returning how many events were stored.
    async fn save_all(&self, events: &[Event]) -> HeraldResult<usize>;
}

/// Most recent events of a user, newest first.
#[async_trait]
pub trait RecentEventReader: Send + Sync {
    async fn find_recent_by_user(&self, user_id: &str, limit: usize) -> HeraldResult<Vec<Event>>;
}

/// Most recent notification records of a user, newest first.
#[async_trait]
pub trait RecentNotificationReader: Send + Sync {
    async fn find_recent_by_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> HeraldResult<Vec<NotificationHistoryRecord>>;
}

/// Liveness probe for a storage backend.
#[async_trait]
pub trait StorageHealth: Send + Sync {
    async fn ping(&self) -> HeraldResult<()>;
}
