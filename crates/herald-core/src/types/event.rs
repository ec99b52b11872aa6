//! User-behavior events.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An immutable user-behavior fact.
///
/// `event_timestamp` keeps the offset it was ingested with, so calendar-day
/// arithmetic happens in the event's own local date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier
    pub id: Uuid,
    /// User the event belongs to
    pub user_id: String,
    /// Event type, e.g. `signup_completed`
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event happened
    pub event_timestamp: DateTime<FixedOffset>,
    /// Event-specific properties
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    /// User traits known at the time of the event
    #[serde(default)]
    pub user_traits: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event with a fresh id and empty properties.
    pub fn new(
        user_id: impl Into<String>,
        event_type: impl Into<String>,
        event_timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            event_type: event_type.into(),
            event_timestamp,
            properties: HashMap::new(),
            user_traits: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_trait(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.user_traits.insert(key.into(), value);
        self
    }

    /// Local calendar date of the event.
    pub fn event_date(&self) -> NaiveDate {
        self.event_timestamp.date_naive()
    }

    /// Nested document view used for property path resolution.
    ///
    /// Top-level keys: `id`, `user_id`, `type`, `event_timestamp`,
    /// `event_date`, `properties`, `user_traits`.
    pub fn as_document(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.to_string(),
            "user_id": self.user_id,
            "type": self.event_type,
            "event_timestamp": self.event_timestamp.to_rfc3339(),
            "event_date": self.event_date().to_string(),
            "properties": self.properties,
            "user_traits": self.user_traits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timestamp(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_event_date_uses_local_offset() {
        let event = Event::new("u_1", "signup_completed", timestamp("2024-03-01T23:30:00-05:00"));
        assert_eq!(event.event_date().to_string(), "2024-03-01");
    }

    #[test]
    fn test_document_view() {
        let event = Event::new("u_1", "payment_failed", timestamp("2024-03-01T10:00:00Z"))
            .with_property("attempt_number", json!(3))
            .with_trait("email", json!("maria@example.com"));

        let doc = event.as_document();
        assert_eq!(doc["type"], json!("payment_failed"));
        assert_eq!(doc["properties"]["attempt_number"], json!(3));
        assert_eq!(doc["user_traits"]["email"], json!("maria@example.com"));
        assert_eq!(doc["event_date"], json!("2024-03-01"));
    }

    #[test]
    fn test_event_serialization_uses_type_key() {
        let event = Event::new("u_1", "link_bank_success", timestamp("2024-03-01T10:00:00Z"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"link_bank_success\""));
    }
}
