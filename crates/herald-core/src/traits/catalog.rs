//! Declarative rule and notification sources.

use async_trait::async_trait;

use crate::error::HeraldResult;
use crate::types::{Notification, NotificationRule};

/// Source of notification rules, in declaration order.
#[async_trait]
pub trait RuleCatalog: Send + Sync {
    async fn get_all(&self) -> HeraldResult<Vec<NotificationRule>>;
}

/// Source of notification catalog entries.
#[async_trait]
pub trait NotificationCatalog: Send + Sync {
    async fn get_all(&self) -> HeraldResult<Vec<Notification>>;
}
