//! Declarative notification rules.
//!
//! A [`NotificationRule`] maps one triggering event type plus a tree of
//! [`EventCondition`]s to a notification type, with an optional debounce
//! policy. Rules are built once at load time and never mutated.

use chrono::Duration;
use strum::{Display, EnumString};

/// Comparison applied by a [`PropertyMatch`].
///
/// Only `Eq` and `Gte` are evaluable; the rest are accepted by the rule
/// loader so that evaluation can refuse them explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum PropertyOperator {
    Eq,
    In,
    Nin,
    Lt,
    Gt,
    Lte,
    Gte,
}

/// Boolean combinator for an [`EventLogic`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LogicOperator {
    And,
    Not,
    Or,
}

/// Compare a value found at `property_xpath` in the event document.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMatch {
    /// Dotted path into the event document, e.g. `properties.status`
    pub property_xpath: String,
    /// Value to compare against
    pub value: serde_json::Value,
    pub operator: PropertyOperator,
}

/// Require a prior event of `event_type` for the same user within
/// `time_proximity`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventProximity {
    pub event_type: String,
    /// Lookback window; `None` is invalid at evaluation time
    pub time_proximity: Option<Duration>,
    /// Conditions the related event must meet (not evaluable yet)
    pub event_conditions: Vec<EventCondition>,
}

/// Combine nested conditions with a logic operator.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogic {
    pub logic: LogicOperator,
    pub event_conditions: Vec<EventCondition>,
}

/// One node of a condition tree.
///
/// Every present payload must pass; a node with no payload is vacuously true.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCondition {
    pub property_match: Option<PropertyMatch>,
    pub event_proximity: Option<EventProximity>,
    pub event_logic: Option<EventLogic>,
}

impl EventCondition {
    /// Node with only a property match.
    pub fn property(
        property_xpath: impl Into<String>,
        operator: PropertyOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            property_match: Some(PropertyMatch {
                property_xpath: property_xpath.into(),
                value,
                operator,
            }),
            ..Default::default()
        }
    }

    /// Node with only an event proximity check.
    pub fn proximity(event_type: impl Into<String>, time_proximity: Duration) -> Self {
        Self {
            event_proximity: Some(EventProximity {
                event_type: event_type.into(),
                time_proximity: Some(time_proximity),
                event_conditions: Vec::new(),
            }),
            ..Default::default()
        }
    }

    /// Node with only a logic combinator.
    pub fn logic(logic: LogicOperator, event_conditions: Vec<EventCondition>) -> Self {
        Self {
            event_logic: Some(EventLogic {
                logic,
                event_conditions,
            }),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.property_match.is_none() && self.event_proximity.is_none() && self.event_logic.is_none()
    }
}

/// A declarative notification trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRule {
    /// Code of the email/sms/pidgeon to send
    pub notification_type: String,
    /// Event type that triggers this rule
    pub event_type: String,
    /// Conditions the event must meet (conjunctive)
    pub event_conditions: Vec<EventCondition>,
    /// Postpone the notification (not evaluable yet)
    pub delay: Option<Duration>,
    /// Re-check conditions after the delay
    pub recheck: bool,
    /// Rolling debounce window; `None` with a limit means "ever"
    pub debounce_period: Option<Duration>,
    /// Send at most this many notifications within the window
    pub debounce_limit: Option<u32>,
    /// Count since local midnight instead of a rolling period
    pub debounce_calendar_day: bool,
}

impl NotificationRule {
    /// Create an unconditional, undebounced rule.
    pub fn new(notification_type: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            notification_type: notification_type.into(),
            event_type: event_type.into(),
            event_conditions: Vec::new(),
            delay: None,
            recheck: false,
            debounce_period: None,
            debounce_limit: None,
            debounce_calendar_day: false,
        }
    }

    pub fn with_condition(mut self, condition: EventCondition) -> Self {
        self.event_conditions.push(condition);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Limit to `limit` notifications per `period` (`None` = ever).
    pub fn with_debounce(mut self, limit: u32, period: Option<Duration>) -> Self {
        self.debounce_limit = Some(limit);
        self.debounce_period = period;
        self
    }

    /// Limit to `limit` notifications per local calendar day.
    pub fn with_calendar_day_debounce(mut self, limit: u32) -> Self {
        self.debounce_limit = Some(limit);
        self.debounce_period = Some(Duration::days(1));
        self.debounce_calendar_day = true;
        self
    }

    pub fn is_debounced(&self) -> bool {
        self.debounce_limit.is_some()
    }
}
