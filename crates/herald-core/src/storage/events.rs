//! Event store.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use tracing::debug;
use uuid::Uuid;

use super::{corrupt_row, lock, open_connection, sortable, threshold};
use crate::error::HeraldResult;
use crate::traits::{EventHistoryReader, EventRecorder, RecentEventReader, StorageHealth};
use crate::types::Event;

const SELECT_EVENT: &str =
    "SELECT id, user_id, event_type, event_timestamp, properties, user_traits FROM events";

/// SQLite-backed event store.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    /// Open (or create) the store at `db_path`; `:memory:` is supported.
    pub fn new(db_path: impl AsRef<Path>) -> HeraldResult<Self> {
        let store = Self {
            conn: Mutex::new(open_connection(db_path.as_ref())?),
        };
        store.create_table()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> HeraldResult<Self> {
        Self::new(":memory:")
    }

    fn create_table(&self) -> HeraldResult<()> {
        let conn = lock(&self.conn, "event store")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                event_timestamp TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                event_date TEXT NOT NULL,
                properties TEXT NOT NULL,
                user_traits TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_user_type_time
                ON events(user_id, event_type, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_events_user_time ON events(user_id, occurred_at);
        "#,
        )?;
        Ok(())
    }

    fn row_to_event(row: &rusqlite::Row<'_>) -> HeraldResult<Event> {
        let id: String = row.get(0)?;
        let event_timestamp: String = row.get(3)?;
        let properties: String = row.get(4)?;
        let user_traits: String = row.get(5)?;

        Ok(Event {
            id: Uuid::parse_str(&id).map_err(corrupt_row)?,
            user_id: row.get(1)?,
            event_type: row.get(2)?,
            event_timestamp: DateTime::parse_from_rfc3339(&event_timestamp).map_err(corrupt_row)?,
            properties: serde_json::from_str(&properties)?,
            user_traits: serde_json::from_str(&user_traits)?,
        })
    }

    fn query_events(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> HeraldResult<Vec<Event>> {
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;

        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(Self::row_to_event(row)?);
        }
        Ok(events)
    }
}

#[async_trait]
impl EventRecorder for SqliteEventStore {
    /// Inserts in one transaction; ids already stored are skipped.
    async fn save_all(&self, events: &[Event]) -> HeraldResult<usize> {
        let mut conn = lock(&self.conn, "event store")?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO events
                    (id, user_id, event_type, event_timestamp, occurred_at, event_date, properties, user_traits)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            for event in events {
                inserted += stmt.execute(params![
                    event.id.to_string(),
                    event.user_id,
                    event.event_type,
                    event.event_timestamp.to_rfc3339(),
                    sortable(event.event_timestamp.with_timezone(&Utc)),
                    event.event_date().to_string(),
                    serde_json::to_string(&event.properties)?,
                    serde_json::to_string(&event.user_traits)?,
                ])?;
            }
        }
        tx.commit()?;

        debug!(received = events.len(), inserted, "Saved events");
        Ok(inserted)
    }
}

#[async_trait]
impl EventHistoryReader for SqliteEventStore {
    async fn find_within_window(
        &self,
        event_type: &str,
        user_id: &str,
        window: Duration,
    ) -> HeraldResult<Vec<Event>> {
        let since = threshold(window)?;
        let conn = lock(&self.conn, "event store")?;
        Self::query_events(
            &conn,
            &format!(
                "{} WHERE event_type = ?1 AND user_id = ?2 AND occurred_at >= ?3 ORDER BY occurred_at DESC",
                SELECT_EVENT
            ),
            params![event_type, user_id, since],
        )
    }
}

#[async_trait]
impl RecentEventReader for SqliteEventStore {
    async fn find_recent_by_user(&self, user_id: &str, limit: usize) -> HeraldResult<Vec<Event>> {
        let conn = lock(&self.conn, "event store")?;
        Self::query_events(
            &conn,
            &format!("{} WHERE user_id = ?1 ORDER BY occurred_at DESC LIMIT ?2", SELECT_EVENT),
            params![user_id, limit as i64],
        )
    }
}

#[async_trait]
impl StorageHealth for SqliteEventStore {
    async fn ping(&self) -> HeraldResult<()> {
        let conn = lock(&self.conn, "event store")?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(user_id: &str, event_type: &str, ago: Duration) -> Event {
        Event::new(user_id, event_type, (Utc::now() - ago).into())
            .with_property("amount", json!(12.5))
            .with_trait("plan", json!("pro"))
    }

    #[tokio::test]
    async fn test_save_and_find_within_window() {
        let store = SqliteEventStore::in_memory().unwrap();
        let recent = event("u_1", "signup_completed", Duration::hours(2));
        let old = event("u_1", "signup_completed", Duration::days(10));
        let other_user = event("u_2", "signup_completed", Duration::hours(1));

        let saved = store
            .save_all(&[recent.clone(), old.clone(), other_user])
            .await
            .unwrap();
        assert_eq!(saved, 3);

        let found = store
            .find_within_window("signup_completed", "u_1", Duration::days(7))
            .await
            .unwrap();
        assert_eq!(found, vec![recent.clone()]);

        let found = store
            .find_within_window("signup_completed", "u_1", Duration::days(30))
            .await
            .unwrap();
        assert_eq!(found, vec![recent, old]);

        assert!(store
            .find_within_window("payment_failed", "u_1", Duration::days(30))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_save_is_idempotent_by_id() {
        let store = SqliteEventStore::in_memory().unwrap();
        let e = event("u_1", "payment_failed", Duration::minutes(1));

        assert_eq!(store.save_all(&[e.clone()]).await.unwrap(), 1);
        assert_eq!(store.save_all(&[e]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offset_survives_round_trip() {
        let store = SqliteEventStore::in_memory().unwrap();
        let ts = DateTime::parse_from_rfc3339("2024-05-10T01:30:00-05:00").unwrap();
        let e = Event::new("u_1", "payment_failed", ts);
        store.save_all(&[e.clone()]).await.unwrap();

        let found = store.find_recent_by_user("u_1", 10).await.unwrap();
        assert_eq!(found[0].event_timestamp.offset(), ts.offset());
        assert_eq!(found[0].event_date(), e.event_date());
    }

    #[tokio::test]
    async fn test_recent_by_user_is_newest_first_and_limited() {
        let store = SqliteEventStore::in_memory().unwrap();
        let events: Vec<_> = (1..=5)
            .map(|h| event("u_1", "page_viewed", Duration::hours(h)))
            .collect();
        store.save_all(&events).await.unwrap();

        let found = store.find_recent_by_user("u_1", 3).await.unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].id, events[0].id);
        assert_eq!(found[2].id, events[2].id);
    }

    #[tokio::test]
    async fn test_out_of_range_window_is_rejected_and_store_stays_usable() {
        let store = SqliteEventStore::in_memory().unwrap();
        let e = event("u_1", "signup_completed", Duration::minutes(5));
        store.save_all(&[e.clone()]).await.unwrap();

        let err = store
            .find_within_window("signup_completed", "u_1", Duration::seconds(10_000_000_000_000))
            .await
            .unwrap_err();
        assert_eq!(err.code().as_str(), "VAL_001");

        let found = store
            .find_within_window("signup_completed", "u_1", Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(found, vec![e]);
    }

    #[tokio::test]
    async fn test_ping() {
        let store = SqliteEventStore::in_memory().unwrap();
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("herald.db");
        let e = event("u_1", "signup_completed", Duration::minutes(5));

        SqliteEventStore::new(&path).unwrap().save_all(&[e.clone()]).await.unwrap();

        let reopened = SqliteEventStore::new(&path).unwrap();
        assert_eq!(reopened.find_recent_by_user("u_1", 1).await.unwrap(), vec![e]);
    }
}
