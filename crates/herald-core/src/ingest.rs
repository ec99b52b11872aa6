//! Event ingestion: validate, persist and enqueue a batch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{HeraldError, HeraldResult};
use crate::traits::{EventQueue, EventRecorder};
use crate::types::Event;

/// Wire shape of one incoming event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDto {
    pub user_id: String,
    pub event_type: String,
    /// RFC 3339 timestamp; the offset is kept
    pub event_timestamp: DateTime<FixedOffset>,
    pub properties: HashMap<String, serde_json::Value>,
    pub user_traits: HashMap<String, serde_json::Value>,
}

impl EventDto {
    /// Convert into a domain event with a fresh id.
    pub fn into_event(self) -> HeraldResult<Event> {
        if self.user_id.trim().is_empty() {
            return Err(HeraldError::missing_field("user_id"));
        }
        if self.event_type.trim().is_empty() {
            return Err(HeraldError::missing_field("event_type"));
        }

        let mut event = Event::new(self.user_id, self.event_type, self.event_timestamp);
        event.properties = self.properties;
        event.user_traits = self.user_traits;
        Ok(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Items that passed validation
    pub accepted: usize,
    /// Items newly written to storage
    pub saved: usize,
}

/// Accepts raw event payloads from the outside world.
#[derive(Clone)]
pub struct EventIngestor {
    recorder: Arc<dyn EventRecorder>,
    queue: Arc<dyn EventQueue>,
}

impl EventIngestor {
    pub fn new(recorder: Arc<dyn EventRecorder>, queue: Arc<dyn EventQueue>) -> Self {
        Self { recorder, queue }
    }

    /// Ingest a batch of untyped items.
    ///
    /// Items that fail validation are dropped. Saving and enqueueing run
    /// concurrently and both complete; a save error is reported before a
    /// queue error.
    pub async fn ingest(&self, items: Vec<serde_json::Value>) -> HeraldResult<IngestOutcome> {
        let received = items.len();
        let events: Vec<Event> = items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                match serde_json::from_value::<EventDto>(item)
                    .map_err(HeraldError::from)
                    .and_then(EventDto::into_event)
                {
                    Ok(event) => Some(event),
                    Err(err) => {
                        debug!(index = idx, error = %err, "Dropping invalid event");
                        None
                    }
                }
            })
            .collect();

        if events.len() < received {
            warn!(received, accepted = events.len(), "Dropped invalid events from batch");
        }
        if events.is_empty() {
            return Ok(IngestOutcome {
                accepted: 0,
                saved: 0,
            });
        }

        let (saved, queued) = tokio::join!(
            self.recorder.save_all(&events),
            self.queue.events_received(&events),
        );
        let saved = saved?;
        queued?;

        info!(accepted = events.len(), saved, "Events ingested");
        Ok(IngestOutcome {
            accepted: events.len(),
            saved,
        })
    }
}
