//! Core domain types for herald.

mod event;
mod notification;
mod rule;

pub use event::Event;
pub use notification::{
    Notification, NotificationChannel, NotificationHistoryRecord, NotificationIntent,
    NotificationStatus,
};
pub use rule::{
    EventCondition, EventLogic, EventProximity, LogicOperator, NotificationRule, PropertyMatch,
    PropertyOperator,
};
