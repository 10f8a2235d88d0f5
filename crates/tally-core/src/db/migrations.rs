//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: Initial schema
///
/// Every synchronized collection carries the same envelope columns:
/// `local_id` (primary key, never reassigned), nullable unique `server_id`
/// (the `server_id -> local_id` index for pull merges), the
/// `is_locally_created`/`needs_sync` flags, and store-owned timestamps.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS locations (
            local_id TEXT PRIMARY KEY,
            server_id INTEGER UNIQUE,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            path TEXT NOT NULL,
            depth INTEGER NOT NULL,
            parent_server_id INTEGER,
            is_locally_created INTEGER NOT NULL DEFAULT 0,
            needs_sync INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_locations_code ON locations(code);
        CREATE INDEX IF NOT EXISTS idx_locations_path ON locations(path);

        CREATE TABLE IF NOT EXISTS inventory_items (
            local_id TEXT PRIMARY KEY,
            server_id INTEGER UNIQUE,
            location_server_id INTEGER NOT NULL,
            sku TEXT NOT NULL,
            name TEXT NOT NULL,
            system_qty INTEGER NOT NULL,
            physical_qty INTEGER,
            biometric_tag TEXT,
            remarks TEXT,
            is_locally_created INTEGER NOT NULL DEFAULT 0,
            needs_sync INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_location ON inventory_items(location_server_id);
        CREATE INDEX IF NOT EXISTS idx_items_dirty ON inventory_items(needs_sync);

        CREATE TABLE IF NOT EXISTS audit_reports (
            local_id TEXT PRIMARY KEY,
            server_id INTEGER UNIQUE,
            location_server_id INTEGER NOT NULL,
            auditor_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            is_locally_created INTEGER NOT NULL DEFAULT 0,
            needs_sync INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reports_dirty ON audit_reports(needs_sync);

        CREATE TABLE IF NOT EXISTS audit_findings (
            local_id TEXT PRIMARY KEY,
            server_id INTEGER UNIQUE,
            report_local_id TEXT NOT NULL REFERENCES audit_reports(local_id),
            item_server_id INTEGER NOT NULL,
            counted_qty INTEGER NOT NULL,
            difference INTEGER NOT NULL,
            biometric_tag TEXT,
            remarks TEXT,
            is_locally_created INTEGER NOT NULL DEFAULT 0,
            needs_sync INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(report_local_id, item_server_id)
        );
        CREATE INDEX IF NOT EXISTS idx_findings_report ON audit_findings(report_local_id);
        CREATE INDEX IF NOT EXISTS idx_findings_dirty ON audit_findings(needs_sync);

        CREATE TABLE IF NOT EXISTS sync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        INSERT INTO schema_version (version) VALUES (1);

        COMMIT;",
    )?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations() {
        let conn = setup();
        run(&conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = setup();
        run(&conn).unwrap();
        run(&conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_all_collections_created() {
        let conn = setup();
        run(&conn).unwrap();

        for table in [
            "locations",
            "inventory_items",
            "audit_reports",
            "audit_findings",
            "sync_meta",
        ] {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM sqlite_master
                        WHERE type = 'table' AND name = ?
                    )",
                    [table],
                    |row| row.get::<_, i32>(0).map(|v| v != 0),
                )
                .unwrap();
            assert!(exists, "missing table {table}");
        }
    }
}
