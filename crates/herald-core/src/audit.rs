//! Per-user audit trail: recent events and notification decisions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HeraldError, HeraldResult};
use crate::traits::{RecentEventReader, RecentNotificationReader};
use crate::types::{Event, NotificationHistoryRecord, NotificationStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAuditItem {
    pub event_id: String,
    pub event_type: String,
    pub event_timestamp: DateTime<FixedOffset>,
    pub properties: HashMap<String, serde_json::Value>,
}

impl From<Event> for EventAuditItem {
    fn from(event: Event) -> Self {
        Self {
            event_id: event.id.to_string(),
            event_type: event.event_type,
            event_timestamp: event.event_timestamp,
            properties: event.properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAuditItem {
    pub notification_type: String,
    pub trigger_event: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    /// Set only for suppressed records
    pub suppression_reason: Option<String>,
}

impl From<NotificationHistoryRecord> for NotificationAuditItem {
    fn from(record: NotificationHistoryRecord) -> Self {
        let suppression_reason = match (&record.status, &record.suppressed_because) {
            (NotificationStatus::Suppressed, Some(because)) => {
                Some(format!("skipped {}: {}", record.notification_type, because))
            }
            _ => None,
        };

        Self {
            notification_type: record.notification_type,
            trigger_event: record.trigger,
            status: record.status,
            created_at: record.created_at,
            suppression_reason,
        }
    }
}

/// Audit view of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAudit {
    pub user_id: String,
    pub recent_events: Vec<EventAuditItem>,
    pub notification_history: Vec<NotificationAuditItem>,
}

/// Builds [`UserAudit`] views from the stores.
#[derive(Clone)]
pub struct UserAuditService {
    events: Arc<dyn RecentEventReader>,
    notifications: Arc<dyn RecentNotificationReader>,
}

impl UserAuditService {
    pub fn new(
        events: Arc<dyn RecentEventReader>,
        notifications: Arc<dyn RecentNotificationReader>,
    ) -> Self {
        Self {
            events,
            notifications,
        }
    }

    /// Up to `limit` newest events and notification records of `user_id`.
    pub async fn audit(&self, user_id: &str, limit: usize) -> HeraldResult<UserAudit> {
        if user_id.trim().is_empty() {
            return Err(HeraldError::missing_field("user_id"));
        }
        if limit == 0 {
            return Err(HeraldError::validation("limit must be greater than zero"));
        }

        let (events, records) = futures::try_join!(
            self.events.find_recent_by_user(user_id, limit),
            self.notifications.find_recent_by_user(user_id, limit),
        )?;

        debug!(user_id, events = events.len(), notifications = records.len(), "Built user audit");

        Ok(UserAudit {
            user_id: user_id.to_string(),
            recent_events: events.into_iter().map(EventAuditItem::from).collect(),
            notification_history: records.into_iter().map(NotificationAuditItem::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SqliteEventStore, SqliteNotificationHistoryStore};
    use crate::traits::{EventRecorder, NotificationHistoryWriter};
    use crate::types::NotificationIntent;
    use serde_json::json;

    async fn service() -> UserAuditService {
        let events = Arc::new(SqliteEventStore::in_memory().unwrap());
        let history = Arc::new(SqliteNotificationHistoryStore::in_memory().unwrap());

        let event = Event::new("u_1", "payment_failed", Utc::now().into())
            .with_property("attempt_number", json!(3));
        events.save_all(&[event]).await.unwrap();

        history
            .save(&NotificationHistoryRecord::from_intent(
                &NotificationIntent::debounced(
                    "INSUFFICIENT_FUNDS_EMAIL",
                    None,
                    "Notification INSUFFICIENT_FUNDS_EMAIL has occured 1 times which is GTE than 1",
                ),
                "payment_failed",
                "u_1",
            ))
            .await
            .unwrap();
        history
            .save(&NotificationHistoryRecord::from_intent(
                &NotificationIntent::send("HIGH_RISK_ALERT", None),
                "payment_failed",
                "u_1",
            ))
            .await
            .unwrap();

        UserAuditService::new(events, history)
    }

    #[tokio::test]
    async fn test_audit_formats_suppression_reason() {
        let audit = service().await.audit("u_1", 50).await.unwrap();

        assert_eq!(audit.user_id, "u_1");
        assert_eq!(audit.recent_events.len(), 1);
        assert_eq!(audit.recent_events[0].properties["attempt_number"], json!(3));
        assert_eq!(audit.notification_history.len(), 2);

        let suppressed = audit
            .notification_history
            .iter()
            .find(|n| n.status == NotificationStatus::Suppressed)
            .unwrap();
        assert_eq!(
            suppressed.suppression_reason.as_deref(),
            Some("skipped INSUFFICIENT_FUNDS_EMAIL: Notification INSUFFICIENT_FUNDS_EMAIL has occured 1 times which is GTE than 1")
        );
        assert_eq!(suppressed.trigger_event, "payment_failed");

        let sent = audit
            .notification_history
            .iter()
            .find(|n| n.status == NotificationStatus::Sent)
            .unwrap();
        assert!(sent.suppression_reason.is_none());
    }

    #[tokio::test]
    async fn test_audit_respects_limit_and_user() {
        let service = service().await;
        assert_eq!(service.audit("u_1", 1).await.unwrap().notification_history.len(), 1);

        let other = service.audit("u_2", 50).await.unwrap();
        assert!(other.recent_events.is_empty());
        assert!(other.notification_history.is_empty());
    }

    #[tokio::test]
    async fn test_audit_rejects_bad_input() {
        let service = service().await;
        assert!(matches!(
            service.audit(" ", 10).await,
            Err(HeraldError::Validation { .. })
        ));
        assert!(service.audit("u_1", 0).await.is_err());
    }
}
