//! In-process event queue and the worker that drains it.
//!
//! Batches travel over a bounded tokio `mpsc` channel. The worker runs
//! [`TriggerNotifications`] for each event in order; a failing event is
//! logged and the batch continues.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{HeraldError, HeraldResult};
use crate::traits::EventQueue;
use crate::trigger::TriggerNotifications;
use crate::types::Event;

/// Receiving half of the dispatch queue.
pub type EventBatchReceiver = mpsc::Receiver<Vec<Event>>;

/// Sending half of the dispatch queue.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: mpsc::Sender<Vec<Event>>,
}

impl EventDispatcher {
    /// Create a dispatcher holding at most `capacity` pending batches.
    ///
    /// Returns the dispatcher and the receiver to hand to the worker.
    pub fn new(capacity: usize) -> (Self, EventBatchReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventQueue for EventDispatcher {
    /// Waits for queue space; fails only once the worker is gone.
    async fn events_received(&self, events: &[Event]) -> HeraldResult<()> {
        self.sender
            .send(events.to_vec())
            .await
            .map_err(|_| HeraldError::internal("event dispatch queue is closed"))
    }
}

/// Counts for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    pub intents: usize,
}

/// Run the trigger use case over every event of a batch.
pub async fn process_batch(trigger: &TriggerNotifications, events: &[Event]) -> BatchReport {
    info!(count = events.len(), "Events received for processing");

    let mut report = BatchReport::default();
    for event in events {
        debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            user_id = %event.user_id,
            properties_count = event.properties.len(),
            "Processing event"
        );

        match trigger.handle(event).await {
            Ok(outcome) if outcome.intents.is_empty() => {
                debug!(event_id = %event.id, "No notification intents triggered");
            }
            Ok(outcome) => {
                let types: Vec<&str> = outcome
                    .intents
                    .iter()
                    .map(|i| i.notification_type.as_str())
                    .collect();
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    user_id = %event.user_id,
                    intents = ?types,
                    intent_count = types.len(),
                    "Notification intents triggered"
                );
                report.intents += types.len();
            }
            Err(err) => {
                error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    user_id = %event.user_id,
                    error = %err,
                    "Failed to process event for notifications"
                );
                report.failed += 1;
            }
        }
        report.processed += 1;
    }

    info!(processed_count = report.processed, failed = report.failed, "Events processing completed");
    report
}

/// Spawn the worker; it exits once every [`EventDispatcher`] is dropped.
pub fn spawn_trigger_worker(
    trigger: TriggerNotifications,
    mut receiver: EventBatchReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Trigger worker started");
        while let Some(batch) = receiver.recv().await {
            process_batch(&trigger, &batch).await;
        }
        info!("Trigger worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StaticNotificationCatalog, StaticRuleCatalog};
    use crate::storage::{SqliteEventStore, SqliteNotificationHistoryStore};
    use crate::traits::RecentNotificationReader;
    use crate::types::{EventCondition, NotificationRule, PropertyOperator};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (TriggerNotifications, Arc<SqliteNotificationHistoryStore>) {
        let rules = StaticRuleCatalog::from_rules(vec![
            NotificationRule::new("HIGH_RISK_ALERT", "payment_failed").with_condition(
                EventCondition::property("properties.attempt_number", PropertyOperator::Gte, json!(3)),
            ),
            NotificationRule::new("NEEDS_AMOUNT", "refund_issued").with_condition(
                EventCondition::property("properties.amount", PropertyOperator::Gte, json!(1)),
            ),
        ]);
        let events = Arc::new(SqliteEventStore::in_memory().unwrap());
        let history = Arc::new(SqliteNotificationHistoryStore::in_memory().unwrap());

        let trigger = TriggerNotifications::new(
            Arc::new(rules),
            Arc::new(StaticNotificationCatalog::default()),
            events,
            history.clone(),
            history.clone(),
        )
        .with_failure_policy(crate::rules::RuleFailurePolicy::FailFast);
        (trigger, history)
    }

    fn payment_failed(attempt: i64) -> Event {
        Event::new("u_1", "payment_failed", Utc::now().into()).with_property("attempt_number", json!(attempt))
    }

    #[tokio::test]
    async fn test_batch_continues_after_failure() {
        let (trigger, history) = setup();
        let broken = Event::new("u_1", "refund_issued", Utc::now().into());

        let report = process_batch(&trigger, &[broken, payment_failed(3), payment_failed(1)]).await;
        assert_eq!(
            report,
            BatchReport {
                processed: 3,
                failed: 1,
                intents: 1
            }
        );

        let records = history.find_recent_by_user("u_1", 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].notification_type, "HIGH_RISK_ALERT");
    }

    #[tokio::test]
    async fn test_worker_drains_queue_and_stops() {
        let (trigger, history) = setup();
        let (dispatcher, receiver) = EventDispatcher::new(4);
        let worker = spawn_trigger_worker(trigger, receiver);

        dispatcher.events_received(&[payment_failed(3)]).await.unwrap();
        dispatcher.events_received(&[payment_failed(4)]).await.unwrap();
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(history.find_recent_by_user("u_1", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_worker_survives_out_of_range_debounce_window() {
        let rules = StaticRuleCatalog::from_rules(vec![
            NotificationRule::new("HIGH_RISK_ALERT", "payment_failed").with_condition(
                EventCondition::property("properties.attempt_number", PropertyOperator::Gte, json!(3)),
            ),
            NotificationRule::new("HUGE_WINDOW", "account_closed")
                .with_debounce(1, Some(chrono::Duration::seconds(10_000_000_000_000))),
        ]);
        let history = Arc::new(SqliteNotificationHistoryStore::in_memory().unwrap());
        let trigger = TriggerNotifications::new(
            Arc::new(rules),
            Arc::new(StaticNotificationCatalog::default()),
            Arc::new(SqliteEventStore::in_memory().unwrap()),
            history.clone(),
            history.clone(),
        );

        let (dispatcher, receiver) = EventDispatcher::new(4);
        let worker = spawn_trigger_worker(trigger, receiver);

        let closed = Event::new("u_1", "account_closed", Utc::now().into());
        dispatcher.events_received(&[closed]).await.unwrap();
        dispatcher.events_received(&[payment_failed(3)]).await.unwrap();
        drop(dispatcher);
        worker.await.unwrap();

        let records = history.find_recent_by_user("u_1", 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].notification_type, "HIGH_RISK_ALERT");
    }

    #[tokio::test]
    async fn test_send_fails_when_worker_gone() {
        let (dispatcher, receiver) = EventDispatcher::new(1);
        drop(receiver);

        let err = dispatcher.events_received(&[payment_failed(3)]).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
