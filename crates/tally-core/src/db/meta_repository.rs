//! Sync metadata repository
//!
//! A singleton key/value record scoped to the authenticated session. Holds
//! the pull/push watermarks the UI folds into a single "last synced" value.
//! Cleared by the full local wipe on logout.

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

const LAST_PULLED_AT: &str = "last_pulled_at";
const LAST_PUSHED_AT: &str = "last_pushed_at";

/// Trait for sync metadata storage operations
pub trait SyncMetaRepository {
    /// Timestamp (Unix ms) of the last completed Pull, if any
    fn last_pulled_at(&self) -> Result<Option<i64>>;

    /// Timestamp (Unix ms) of the last Push that synced at least one record
    fn last_pushed_at(&self) -> Result<Option<i64>>;

    /// Stamp the Pull watermark
    fn set_last_pulled_at(&self, timestamp: i64) -> Result<()>;

    /// Stamp the Push watermark
    fn set_last_pushed_at(&self, timestamp: i64) -> Result<()>;

    /// The more recent of the two watermarks (the UI's "last synced" value)
    fn last_synced_at(&self) -> Result<Option<i64>> {
        let pulled = self.last_pulled_at()?;
        let pushed = self.last_pushed_at()?;
        Ok(match (pulled, pushed) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        })
    }
}

/// SQLite implementation of `SyncMetaRepository`
pub struct SqliteSyncMetaRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSyncMetaRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get(&self, key: &str) -> Result<Option<i64>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    fn set(&self, key: &str, timestamp: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
            params![key, timestamp.to_string()],
        )?;
        Ok(())
    }
}

impl SyncMetaRepository for SqliteSyncMetaRepository<'_> {
    fn last_pulled_at(&self) -> Result<Option<i64>> {
        self.get(LAST_PULLED_AT)
    }

    fn last_pushed_at(&self) -> Result<Option<i64>> {
        self.get(LAST_PUSHED_AT)
    }

    fn set_last_pulled_at(&self, timestamp: i64) -> Result<()> {
        self.set(LAST_PULLED_AT, timestamp)
    }

    fn set_last_pushed_at(&self, timestamp: i64) -> Result<()> {
        self.set(LAST_PUSHED_AT, timestamp)
    }
}
