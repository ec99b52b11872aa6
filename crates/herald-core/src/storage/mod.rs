//! SQLite persistence for events and notification history.

mod events;
mod notifications;

pub use events::SqliteEventStore;
pub use notifications::SqliteNotificationHistoryStore;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::{HeraldError, HeraldResult};

/// Open a database file, or an in-memory database for `:memory:`.
fn open_connection(db_path: &Path) -> HeraldResult<Connection> {
    if db_path.to_str() == Some(":memory:") {
        return Connection::open_in_memory()
            .map_err(|e| HeraldError::connection(e.to_string()));
    }

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Connection::open(db_path).map_err(|e| HeraldError::connection(e.to_string()))
}

fn lock<'a>(conn: &'a Mutex<Connection>, store: &str) -> HeraldResult<MutexGuard<'a, Connection>> {
    conn.lock()
        .map_err(|_| HeraldError::connection(format!("{} connection lock poisoned", store)))
}

/// Fixed-width UTC timestamp; compares correctly as text.
fn sortable(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Lower bound of a window ending now.
///
/// Windows reaching past chrono's range are rejected rather than clamped.
fn threshold(window: Duration) -> HeraldResult<String> {
    Utc::now()
        .checked_sub_signed(window)
        .map(sortable)
        .ok_or_else(|| {
            HeraldError::validation(format!(
                "lookback window of {} seconds is out of range",
                window.num_seconds()
            ))
        })
}

fn corrupt_row(err: impl std::fmt::Display) -> HeraldError {
    HeraldError::internal(format!("corrupt row: {}", err))
}
