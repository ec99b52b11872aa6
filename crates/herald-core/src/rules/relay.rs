//! Routing of one event through the rules indexed for its type.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, ErrorKind, HeraldError, HeraldResult};
use crate::rules::debounce;
use crate::rules::evaluator::ConditionEvaluator;
use crate::traits::{EventHistoryReader, NotificationHistoryReader};
use crate::types::{Event, Notification, NotificationIntent, NotificationRule};

/// What to do when a single rule turns out to be malformed for an event.
///
/// Unsupported features and storage failures always abort routing; this
/// only governs authoring mistakes such as an unresolvable property path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFailurePolicy {
    /// Log a warning and continue with the remaining rules.
    #[default]
    SkipRule,
    /// Abort routing of the whole event.
    FailFast,
}

/// Immutable index of rules by triggering event type.
///
/// A relay is a snapshot: to pick up new catalogs, build a new relay.
pub struct RuleRelay {
    rules_by_event: HashMap<String, Vec<NotificationRule>>,
    notifications: HashMap<String, Notification>,
    evaluator: ConditionEvaluator,
    notification_history: Arc<dyn NotificationHistoryReader>,
    failure_policy: RuleFailurePolicy,
}

impl RuleRelay {
    /// Index `rules` by event type, keeping declaration order per type.
    pub fn new(
        rules: Vec<NotificationRule>,
        notifications: Vec<Notification>,
        event_history: Arc<dyn EventHistoryReader>,
        notification_history: Arc<dyn NotificationHistoryReader>,
    ) -> Self {
        let notifications: HashMap<String, Notification> = notifications
            .into_iter()
            .map(|n| (n.notification_type.clone(), n))
            .collect();

        let mut rules_by_event: HashMap<String, Vec<NotificationRule>> = HashMap::new();
        for rule in rules {
            if !notifications.contains_key(&rule.notification_type) {
                warn!(
                    notification_type = %rule.notification_type,
                    event_type = %rule.event_type,
                    "Rule references a notification missing from the catalog"
                );
            }
            rules_by_event.entry(rule.event_type.clone()).or_default().push(rule);
        }

        Self {
            rules_by_event,
            notifications,
            evaluator: ConditionEvaluator::new(event_history),
            notification_history,
            failure_policy: RuleFailurePolicy::default(),
        }
    }

    /// Builder method to set the malformed rule policy
    pub fn with_failure_policy(mut self, policy: RuleFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Rules triggered by `event_type`, in declaration order.
    pub fn rules_for(&self, event_type: &str) -> &[NotificationRule] {
        self.rules_by_event
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Catalog entry for a notification type.
    pub fn notification(&self, notification_type: &str) -> Option<&Notification> {
        self.notifications.get(notification_type)
    }

    /// Decide which notifications `event` triggers.
    ///
    /// Intents to send come first, then debounced intents; each group keeps
    /// rule declaration order. Events with no rules never touch storage.
    pub async fn route(&self, event: &Event) -> HeraldResult<Vec<NotificationIntent>> {
        let rules = self.rules_for(&event.event_type);
        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let mut intents = Vec::new();
        let mut debounced = Vec::new();

        for rule in rules {
            match self.route_rule(event, rule).await {
                Ok(Some(intent)) if intent.is_debounced() => debounced.push(intent),
                Ok(Some(intent)) => intents.push(intent),
                Ok(None) => {}
                Err(err)
                    if err.kind() == ErrorKind::MalformedRule
                        && self.failure_policy == RuleFailurePolicy::SkipRule =>
                {
                    warn!(
                        notification_type = %rule.notification_type,
                        event_type = %event.event_type,
                        event_id = %event.id,
                        error = %err,
                        "Skipping malformed rule"
                    );
                }
                Err(err) => return Err(err.for_rule(&rule.notification_type)),
            }
        }

        intents.extend(debounced);
        Ok(intents)
    }

    async fn route_rule(
        &self,
        event: &Event,
        rule: &NotificationRule,
    ) -> HeraldResult<Option<NotificationIntent>> {
        if let Some(delay) = rule.delay {
            return Err(HeraldError::unsupported(
                "delay",
                ErrorCode::FeatDelayedRule,
                format!(
                    "rule {} has a {}s delay; delayed notifications are not supported",
                    rule.notification_type,
                    delay.num_seconds()
                ),
            ));
        }

        if !self.evaluator.matches(event, &rule.event_conditions).await? {
            debug!(
                notification_type = %rule.notification_type,
                event_id = %event.id,
                "Rule conditions not met"
            );
            return Ok(None);
        }

        if rule.is_debounced() {
            let window = debounce::lookback(rule, event.event_timestamp);
            let count = self
                .notification_history
                .count_within_window(&event.user_id, &rule.notification_type, window)
                .await?;

            if let Some(reason) = debounce::suppression_reason(rule, count) {
                info!(
                    notification_type = %rule.notification_type,
                    user_id = %event.user_id,
                    count,
                    limit = rule.debounce_limit,
                    window_secs = window.num_seconds(),
                    "Notification debounced"
                );
                return Ok(Some(NotificationIntent::debounced(
                    rule.notification_type.clone(),
                    rule.delay,
                    reason,
                )));
            }
        }

        Ok(Some(NotificationIntent::send(rule.notification_type.clone(), rule.delay)))
    }
}
