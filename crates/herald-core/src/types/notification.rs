//! Notification catalog entries, engine intents and history records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Delivery channel of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationChannel {
    Sms,
    Email,
    Pidgeon,
}

/// Static catalog entry referenced by `notification_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub notification_type: String,
    /// Internal-only notification
    pub private: bool,
    pub channel: NotificationChannel,
    /// Message template
    #[serde(default)]
    pub text: String,
}

/// Decision produced by the rule relay for one matched rule.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationIntent {
    pub notification_type: String,
    pub delay: Option<Duration>,
    /// `Some` when the match was suppressed by debounce
    pub debounced_because: Option<String>,
}

impl NotificationIntent {
    /// An intent that should be sent.
    pub fn send(notification_type: impl Into<String>, delay: Option<Duration>) -> Self {
        Self {
            notification_type: notification_type.into(),
            delay,
            debounced_because: None,
        }
    }

    /// A matched intent suppressed by debounce.
    pub fn debounced(
        notification_type: impl Into<String>,
        delay: Option<Duration>,
        because: impl Into<String>,
    ) -> Self {
        Self {
            notification_type: notification_type.into(),
            delay,
            debounced_because: Some(because.into()),
        }
    }

    pub fn is_debounced(&self) -> bool {
        self.debounced_because.is_some()
    }
}

/// Lifecycle status of a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Suppressed,
}

/// Persisted audit trail of one notification decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationHistoryRecord {
    pub id: Uuid,
    /// Notification type
    #[serde(rename = "type")]
    pub notification_type: String,
    /// Event type that triggered the notification
    pub trigger: String,
    pub user_id: String,
    pub status: NotificationStatus,
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressed_because: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationHistoryRecord {
    /// Build the record for an intent routed from an event.
    ///
    /// Debounced intents become `Suppressed`, everything else `Sent`.
    pub fn from_intent(
        intent: &NotificationIntent,
        trigger: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let status = if intent.is_debounced() {
            NotificationStatus::Suppressed
        } else {
            NotificationStatus::Sent
        };

        Self {
            id: Uuid::new_v4(),
            notification_type: intent.notification_type.clone(),
            trigger: trigger.into(),
            user_id: user_id.into(),
            status,
            retries: 0,
            suppressed_because: intent.debounced_because.clone(),
            created_at: Utc::now(),
        }
    }
}
