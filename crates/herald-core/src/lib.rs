//! herald-core - Core library for herald.
//!
//! Decides which notifications a user-behavior event triggers. Declarative
//! rules are matched against each event, debounce limits are checked
//! against notification history, and every decision is recorded.
//!
//! # Example
//!
//! ```ignore
//! use herald_core::{StaticRuleCatalog, StaticNotificationCatalog, TriggerNotifications};
//!
//! let rules = Arc::new(StaticRuleCatalog::from_file("config/notification_rules.yml")?);
//! let notifications = Arc::new(StaticNotificationCatalog::from_file("config/notifications.yaml")?);
//! let events = Arc::new(SqliteEventStore::new("herald.db")?);
//! let history = Arc::new(SqliteNotificationHistoryStore::new("herald.db")?);
//!
//! let trigger = TriggerNotifications::new(rules, notifications, events, history.clone(), history);
//! let outcome = trigger.handle(&event).await?;
//! ```

pub mod audit;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod rules;
pub mod storage;
pub mod traits;
pub mod trigger;
pub mod types;

// Re-export commonly used types
pub use audit::{UserAudit, UserAuditService};
pub use catalog::{StaticNotificationCatalog, StaticRuleCatalog};
pub use config::HeraldConfig;
pub use dispatch::{spawn_trigger_worker, EventDispatcher};
pub use error::{ErrorCode, ErrorKind, HeraldError, HeraldResult};
pub use ingest::{EventDto, EventIngestor, IngestOutcome};
pub use rules::{ConditionEvaluator, RuleFailurePolicy, RuleRelay};
pub use storage::{SqliteEventStore, SqliteNotificationHistoryStore};
pub use trigger::{TriggerNotifications, TriggerOutcome};
pub use types::{
    Event, EventCondition, Notification, NotificationChannel, NotificationHistoryRecord,
    NotificationIntent, NotificationRule, NotificationStatus,
};
