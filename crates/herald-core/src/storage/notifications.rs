//! Notification history store.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{corrupt_row, lock, open_connection, sortable, threshold};
use crate::error::HeraldResult;
use crate::traits::{
    NotificationHistoryReader, NotificationHistoryWriter, RecentNotificationReader, StorageHealth,
};
use crate::types::{NotificationHistoryRecord, NotificationStatus};

/// SQLite-backed notification history.
pub struct SqliteNotificationHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteNotificationHistoryStore {
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
        let conn = lock(&self.conn, "notification history")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS notification_history (
                id TEXT PRIMARY KEY,
                notification_type TEXT NOT NULL,
                trigger_event TEXT NOT NULL,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL,
                retries INTEGER NOT NULL DEFAULT 0,
                suppressed_because TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_user_type_time
                ON notification_history(user_id, notification_type, created_at);
        "#,
        )?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> HeraldResult<NotificationHistoryRecord> {
        let id: String = row.get(0)?;
        let status: String = row.get(4)?;
        let created_at: String = row.get(7)?;

        Ok(NotificationHistoryRecord {
            id: Uuid::parse_str(&id).map_err(corrupt_row)?,
            notification_type: row.get(1)?,
            trigger: row.get(2)?,
            user_id: row.get(3)?,
            status: NotificationStatus::from_str(&status).map_err(corrupt_row)?,
            retries: row.get(5)?,
            suppressed_because: row.get(6)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(corrupt_row)?,
        })
    }
}

#[async_trait]
impl NotificationHistoryWriter for SqliteNotificationHistoryStore {
    async fn save(&self, record: &NotificationHistoryRecord) -> HeraldResult<()> {
        let conn = lock(&self.conn, "notification history")?;
        conn.execute(
            "INSERT INTO notification_history
                (id, notification_type, trigger_event, user_id, status, retries, suppressed_because, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.to_string(),
                record.notification_type,
                record.trigger,
                record.user_id,
                record.status.to_string(),
                record.retries,
                record.suppressed_because,
                sortable(record.created_at),
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl NotificationHistoryReader for SqliteNotificationHistoryStore {
    /// Counts records of every status, suppressed ones included.
    async fn count_within_window(
        &self,
        user_id: &str,
        notification_type: &str,
        window: Duration,
    ) -> HeraldResult<u64> {
        let since = threshold(window)?;
        let conn = lock(&self.conn, "notification history")?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notification_history
             WHERE user_id = ?1 AND notification_type = ?2 AND created_at >= ?3",
            params![user_id, notification_type, since],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl RecentNotificationReader for SqliteNotificationHistoryStore {
    async fn find_recent_by_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> HeraldResult<Vec<NotificationHistoryRecord>> {
        let conn = lock(&self.conn, "notification history")?;
        let mut stmt = conn.prepare(
            "SELECT id, notification_type, trigger_event, user_id, status, retries, suppressed_because, created_at
             FROM notification_history
             WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;
        let mut rows = stmt.query(params![user_id, limit as i64])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(Self::row_to_record(row)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl StorageHealth for SqliteNotificationHistoryStore {
    async fn ping(&self) -> HeraldResult<()> {
        let conn = lock(&self.conn, "notification history")?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
