//! Database connection management

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::migrations;

/// Wrapper around the single SQLite connection shared by the engine.
///
/// Repositories borrow the connection for the duration of one operation or
/// one explicit transaction, so concurrent readers wait only for the length
/// of an atomic batch, never for a whole sync cycle.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        configure(&conn);
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Borrow the shared connection.
    ///
    /// The guard gives mutable access so callers can open transactions for
    /// atomic batch writes.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full local data wipe: drop every collection and rebuild the schema.
    ///
    /// Used on logout and for corrupted-store recovery. The remote service
    /// remains the durable source of truth, so losing unsynced edits here is
    /// the accepted trade for store integrity.
    pub fn wipe(&self) -> Result<()> {
        let conn = self.connection();
        conn.execute_batch(
            "BEGIN;
             DROP TABLE IF EXISTS audit_findings;
             DROP TABLE IF EXISTS audit_reports;
             DROP TABLE IF EXISTS inventory_items;
             DROP TABLE IF EXISTS locations;
             DROP TABLE IF EXISTS sync_meta;
             DROP TABLE IF EXISTS schema_version;
             COMMIT;",
        )?;
        migrations::run(&conn)?;
        tracing::info!("local store wiped and schema rebuilt");
        Ok(())
    }
}

/// Configure SQLite for a single mobile-style writer with concurrent readers
fn configure(conn: &Connection) {
    // WAL is unavailable for in-memory databases; ignore failures
    conn.pragma_update(None, "journal_mode", "WAL").ok();
    conn.pragma_update(None, "synchronous", "NORMAL").ok();
    conn.pragma_update(None, "foreign_keys", "ON").ok();
}
