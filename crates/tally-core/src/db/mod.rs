//! Local record store for Tally
//!
//! A plain repository interface per entity kind over SQLite: `find`,
//! predicate queries, and atomic batch writes (callers wrap multi-record
//! merges in an explicit transaction on the shared connection).

mod audit_repository;
mod connection;
mod meta_repository;
mod migrations;
mod repository;

pub use audit_repository::{
    FindingRepository, ReportRepository, SqliteFindingRepository, SqliteReportRepository,
};
pub use connection::Database;
pub use meta_repository::{SqliteSyncMetaRepository, SyncMetaRepository};
pub use repository::{
    InventoryRepository, LocationRepository, SqliteInventoryRepository, SqliteLocationRepository,
};

use crate::error::Result;
use rusqlite::Connection;

/// Parse a TEXT column through `FromStr`.
///
/// A stored value that no longer parses (a mangled UUID, an unknown status)
/// means the store itself is damaged, so the failure is reported as a
/// conversion error rather than papered over with a fresh default.
pub(crate) fn parse_text_column<T>(index: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    value.parse().map_err(|error: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, error.into())
    })
}

/// Outcome of merging one pulled record into the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New local record created from the server-sourced row
    Inserted,
    /// Existing clean record updated with remote fields
    Updated,
    /// Remote fields matched the local record; nothing written
    Unchanged,
    /// Local record has unsynced edits; merge withheld until pushed
    SkippedDirty,
}

/// Count every dirty record across the synchronized collections.
///
/// This is the value surfaced to the UI as the pending-change badge:
/// dirty reports + dirty findings + dirty items.
pub fn count_pending(conn: &Connection) -> Result<u64> {
    let reports = SqliteReportRepository::new(conn).count_dirty()?;
    let findings = SqliteFindingRepository::new(conn).count_dirty()?;
    let items = SqliteInventoryRepository::new(conn).count_dirty()?;
    Ok(reports + findings + items)
}
