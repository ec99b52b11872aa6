//! Orchestration of one event: load rules, route, persist decisions.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, instrument};

use crate::error::{HeraldError, HeraldResult};
use crate::rules::{RuleFailurePolicy, RuleRelay};
use crate::traits::{
    EventHistoryReader, NotificationCatalog, NotificationHistoryReader, NotificationHistoryWriter,
    RuleCatalog,
};
use crate::types::{Event, NotificationHistoryRecord, NotificationIntent};

/// Result of handling one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerOutcome {
    /// Every routed intent, sent first then debounced
    pub intents: Vec<NotificationIntent>,
}

impl TriggerOutcome {
    /// Intents that were not debounced.
    pub fn sent(&self) -> impl Iterator<Item = &NotificationIntent> {
        self.intents.iter().filter(|i| !i.is_debounced())
    }

    /// Intents suppressed by debounce.
    pub fn suppressed(&self) -> impl Iterator<Item = &NotificationIntent> {
        self.intents.iter().filter(|i| i.is_debounced())
    }
}

/// Entry point for processing events.
///
/// Catalogs are read on every call and a fresh [`RuleRelay`] is built from
/// them, so catalog changes apply to the next event.
#[derive(Clone)]
pub struct TriggerNotifications {
    rule_catalog: Arc<dyn RuleCatalog>,
    notification_catalog: Arc<dyn NotificationCatalog>,
    event_history: Arc<dyn EventHistoryReader>,
    notification_history: Arc<dyn NotificationHistoryReader>,
    history_writer: Arc<dyn NotificationHistoryWriter>,
    failure_policy: RuleFailurePolicy,
}

impl TriggerNotifications {
    pub fn new(
        rule_catalog: Arc<dyn RuleCatalog>,
        notification_catalog: Arc<dyn NotificationCatalog>,
        event_history: Arc<dyn EventHistoryReader>,
        notification_history: Arc<dyn NotificationHistoryReader>,
        history_writer: Arc<dyn NotificationHistoryWriter>,
    ) -> Self {
        Self {
            rule_catalog,
            notification_catalog,
            event_history,
            notification_history,
            history_writer,
            failure_policy: RuleFailurePolicy::default(),
        }
    }

    /// Builder method to set the malformed rule policy
    pub fn with_failure_policy(mut self, policy: RuleFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Route `event` and record one history entry per intent.
    ///
    /// Writes run concurrently and are all attempted; if any fail, the
    /// routed intents are discarded and a database error is returned.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle(&self, event: &Event) -> HeraldResult<TriggerOutcome> {
        let relay = RuleRelay::new(
            self.rule_catalog.get_all().await?,
            self.notification_catalog.get_all().await?,
            Arc::clone(&self.event_history),
            Arc::clone(&self.notification_history),
        )
        .with_failure_policy(self.failure_policy);

        let intents = relay.route(event).await?;
        if intents.is_empty() {
            return Ok(TriggerOutcome::default());
        }

        let records: Vec<NotificationHistoryRecord> = intents
            .iter()
            .map(|intent| NotificationHistoryRecord::from_intent(intent, &event.event_type, &event.user_id))
            .collect();

        let results = join_all(records.iter().map(|record| self.history_writer.save(record))).await;

        let mut failed = 0usize;
        for (record, result) in records.iter().zip(results) {
            if let Err(err) = result {
                failed += 1;
                error!(
                    notification_type = %record.notification_type,
                    record_id = %record.id,
                    error = %err,
                    "Failed to record notification"
                );
            }
        }

        if failed > 0 {
            return Err(HeraldError::database(format!(
                "failed to record {} of {} notifications for event {}",
                failed,
                records.len(),
                event.id
            )));
        }

        let outcome = TriggerOutcome { intents };
        info!(
            sent = outcome.sent().count(),
            suppressed = outcome.suppressed().count(),
            "Notifications triggered"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::traits::{MockEventHistoryReader, MockNotificationHistoryReader, MockNotificationHistoryWriter};
    use crate::types::{
        EventCondition, Notification, NotificationChannel, NotificationRule, NotificationStatus,
        PropertyOperator,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedRules(Vec<NotificationRule>);

    #[async_trait]
    impl RuleCatalog for FixedRules {
        async fn get_all(&self) -> HeraldResult<Vec<NotificationRule>> {
            Ok(self.0.clone())
        }
    }

    struct FixedNotifications;

    #[async_trait]
    impl NotificationCatalog for FixedNotifications {
        async fn get_all(&self) -> HeraldResult<Vec<Notification>> {
            Ok(vec![Notification {
                notification_type: "WELCOME_EMAIL".to_string(),
                private: false,
                channel: NotificationChannel::Email,
                text: "Welcome aboard".to_string(),
            }])
        }
    }

    fn rules() -> Vec<NotificationRule> {
        vec![
            NotificationRule::new("WELCOME_EMAIL", "signup_completed").with_condition(
                EventCondition::property("user_traits.marketing_opt_in", PropertyOperator::Eq, json!("true")),
            ),
            NotificationRule::new("WELCOME_SMS", "signup_completed").with_debounce(1, Some(Duration::days(1))),
        ]
    }

    fn signup() -> Event {
        Event::new(
            "u_42",
            "signup_completed",
            DateTime::parse_from_rfc3339("2024-05-10T09:00:00+02:00").unwrap(),
        )
        .with_trait("marketing_opt_in", json!(true))
    }

    fn trigger(count: u64, writer: MockNotificationHistoryWriter) -> TriggerNotifications {
        let mut events = MockEventHistoryReader::new();
        events.expect_find_within_window().times(0);
        let mut history = MockNotificationHistoryReader::new();
        history.expect_count_within_window().returning(move |_, _, _| Ok(count));

        TriggerNotifications::new(
            Arc::new(FixedRules(rules())),
            Arc::new(FixedNotifications),
            Arc::new(events),
            Arc::new(history),
            Arc::new(writer),
        )
    }

    #[tokio::test]
    async fn test_records_one_entry_per_intent() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&saved);
        let mut writer = MockNotificationHistoryWriter::new();
        writer.expect_save().times(2).returning(move |record| {
            sink.lock().unwrap().push(record.clone());
            Ok(())
        });

        let outcome = trigger(1, writer).handle(&signup()).await.unwrap();
        assert_eq!(outcome.intents.len(), 2);
        assert_eq!(outcome.sent().count(), 1);
        assert_eq!(outcome.suppressed().count(), 1);

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|r| r.trigger == "signup_completed"));
        assert!(saved.iter().all(|r| r.user_id == "u_42"));
        assert!(saved.iter().all(|r| r.retries == 0));

        let welcome = saved.iter().find(|r| r.notification_type == "WELCOME_EMAIL").unwrap();
        assert_eq!(welcome.status, NotificationStatus::Sent);
        assert!(welcome.suppressed_because.is_none());

        let sms = saved.iter().find(|r| r.notification_type == "WELCOME_SMS").unwrap();
        assert_eq!(sms.status, NotificationStatus::Suppressed);
        assert!(sms.suppressed_because.is_some());
    }

    #[tokio::test]
    async fn test_no_intents_no_writes() {
        let mut writer = MockNotificationHistoryWriter::new();
        writer.expect_save().times(0);

        let event = Event::new("u_42", "page_viewed", signup().event_timestamp);
        let outcome = trigger(0, writer).handle(&event).await.unwrap();
        assert!(outcome.intents.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_attempts_all_and_fails() {
        let mut writer = MockNotificationHistoryWriter::new();
        writer.expect_save().times(2).returning(|record| {
            if record.notification_type == "WELCOME_EMAIL" {
                Err(HeraldError::database("disk full"))
            } else {
                Ok(())
            }
        });

        let err = trigger(0, writer).handle(&signup()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DependencyFailure);
        assert!(err.to_string().contains("1 of 2"));
    }

    #[tokio::test]
    async fn test_history_failure_propagates_without_writes() {
        let mut history = MockNotificationHistoryReader::new();
        history
            .expect_count_within_window()
            .returning(|_, _, _| Err(HeraldError::database("timeout")));
        let mut writer = MockNotificationHistoryWriter::new();
        writer.expect_save().times(0);

        let trigger = TriggerNotifications::new(
            Arc::new(FixedRules(rules())),
            Arc::new(FixedNotifications),
            Arc::new(MockEventHistoryReader::new()),
            Arc::new(history),
            Arc::new(writer),
        );

        let err = trigger.handle(&signup()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DependencyFailure);
    }
}
