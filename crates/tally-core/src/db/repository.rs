//! Location and inventory repositories

#![allow(clippy::cast_sign_loss)] // COUNT(*) is never negative

use crate::db::{parse_text_column, UpsertOutcome};
use crate::error::{Error, Result};
use crate::models::{InventoryItem, ItemId, Location, LocationId, PulledItem, PulledLocation};
use crate::util::unix_timestamp_ms;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for location storage operations
pub trait LocationRepository {
    /// Get a location by local id
    fn find(&self, id: &LocationId) -> Result<Option<Location>>;

    /// Get a location by its remote id
    fn find_by_server_id(&self, server_id: i64) -> Result<Option<Location>>;

    /// Get a location by its code
    fn find_by_code(&self, code: &str) -> Result<Option<Location>>;

    /// List all locations, hierarchy order (by materialized path)
    fn list(&self) -> Result<Vec<Location>>;

    /// Merge one server-sourced location.
    ///
    /// Locations are pull-only on the client, so the merge is unconditional:
    /// update by `server_id`, or create a new clean local record.
    fn upsert_pulled(&self, incoming: &PulledLocation) -> Result<UpsertOutcome>;
}

/// Trait for inventory item storage operations
pub trait InventoryRepository {
    /// Get an item by local id
    fn find(&self, id: &ItemId) -> Result<Option<InventoryItem>>;

    /// Get an item by its remote id
    fn find_by_server_id(&self, server_id: i64) -> Result<Option<InventoryItem>>;

    /// Get an item by its SKU (unique in the source system)
    fn find_by_sku(&self, sku: &str) -> Result<Option<InventoryItem>>;

    /// List items scoped to one location (by the location's remote id)
    fn list_by_location(&self, location_server_id: i64) -> Result<Vec<InventoryItem>>;

    /// List every item with unsynced local edits
    fn list_dirty(&self) -> Result<Vec<InventoryItem>>;

    /// Merge one server-sourced item, skipping records with unsynced edits
    fn upsert_pulled(&self, incoming: &PulledItem) -> Result<UpsertOutcome>;

    /// Record the auditor's physical count for an item.
    ///
    /// Touches only the auditor-editable fields and marks the record dirty.
    fn record_count(
        &self,
        id: &ItemId,
        physical_qty: i64,
        biometric_tag: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<InventoryItem>;

    /// Clear the dirty flag after a successful push
    fn mark_synced(&self, id: &ItemId) -> Result<()>;

    /// Number of dirty items
    fn count_dirty(&self) -> Result<u64>;
}

/// SQLite implementation of `LocationRepository`
pub struct SqliteLocationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteLocationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a location from a database row
    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Location> {
        let local_id: String = row.get(0)?;
        Ok(Location {
            local_id: parse_text_column(0, &local_id)?,
            server_id: row.get(1)?,
            code: row.get(2)?,
            name: row.get(3)?,
            path: row.get(4)?,
            depth: row.get(5)?,
            parent_server_id: row.get(6)?,
            is_locally_created: row.get::<_, i32>(7)? != 0,
            needs_sync: row.get::<_, i32>(8)? != 0,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

const LOCATION_COLUMNS: &str = "local_id, server_id, code, name, path, depth, parent_server_id, \
                                is_locally_created, needs_sync, created_at, updated_at";

impl LocationRepository for SqliteLocationRepository<'_> {
    fn find(&self, id: &LocationId) -> Result<Option<Location>> {
        self.conn
            .query_row(
                &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE local_id = ?"),
                params![id.as_str()],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn find_by_server_id(&self, server_id: i64) -> Result<Option<Location>> {
        self.conn
            .query_row(
                &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE server_id = ?"),
                params![server_id],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Location>> {
        self.conn
            .query_row(
                &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE code = ?"),
                params![code],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list(&self) -> Result<Vec<Location>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {LOCATION_COLUMNS} FROM locations ORDER BY path"))?;
        let locations = stmt
            .query_map([], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(locations)
    }

    fn upsert_pulled(&self, incoming: &PulledLocation) -> Result<UpsertOutcome> {
        if let Some(existing) = self.find_by_server_id(incoming.server_id)? {
            if !incoming.differs_from(&existing) {
                return Ok(UpsertOutcome::Unchanged);
            }
            self.conn.execute(
                "UPDATE locations
                 SET code = ?, name = ?, path = ?, depth = ?, parent_server_id = ?, updated_at = ?
                 WHERE local_id = ?",
                params![
                    incoming.code,
                    incoming.name,
                    incoming.path,
                    incoming.depth,
                    incoming.parent_server_id,
                    unix_timestamp_ms(),
                    existing.local_id.as_str()
                ],
            )?;
            return Ok(UpsertOutcome::Updated);
        }

        let now = unix_timestamp_ms();
        self.conn.execute(
            "INSERT INTO locations
             (local_id, server_id, code, name, path, depth, parent_server_id,
              is_locally_created, needs_sync, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)",
            params![
                LocationId::new().as_str(),
                incoming.server_id,
                incoming.code,
                incoming.name,
                incoming.path,
                incoming.depth,
                incoming.parent_server_id,
                now,
                now
            ],
        )?;
        Ok(UpsertOutcome::Inserted)
    }
}

/// SQLite implementation of `InventoryRepository`
pub struct SqliteInventoryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteInventoryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an inventory item from a database row
    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InventoryItem> {
        let local_id: String = row.get(0)?;
        Ok(InventoryItem {
            local_id: parse_text_column(0, &local_id)?,
            server_id: row.get(1)?,
            location_server_id: row.get(2)?,
            sku: row.get(3)?,
            name: row.get(4)?,
            system_qty: row.get(5)?,
            physical_qty: row.get(6)?,
            biometric_tag: row.get(7)?,
            remarks: row.get(8)?,
            is_locally_created: row.get::<_, i32>(9)? != 0,
            needs_sync: row.get::<_, i32>(10)? != 0,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

const ITEM_COLUMNS: &str = "local_id, server_id, location_server_id, sku, name, system_qty, \
                            physical_qty, biometric_tag, remarks, is_locally_created, needs_sync, \
                            created_at, updated_at";

impl InventoryRepository for SqliteInventoryRepository<'_> {
    fn find(&self, id: &ItemId) -> Result<Option<InventoryItem>> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE local_id = ?"),
                params![id.as_str()],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn find_by_server_id(&self, server_id: i64) -> Result<Option<InventoryItem>> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE server_id = ?"),
                params![server_id],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn find_by_sku(&self, sku: &str) -> Result<Option<InventoryItem>> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = ?"),
                params![sku],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_by_location(&self, location_server_id: i64) -> Result<Vec<InventoryItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items
             WHERE location_server_id = ? ORDER BY sku"
        ))?;
        let items = stmt
            .query_map(params![location_server_id], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn list_dirty(&self) -> Result<Vec<InventoryItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items
             WHERE needs_sync = 1 ORDER BY updated_at"
        ))?;
        let items = stmt
            .query_map([], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn upsert_pulled(&self, incoming: &PulledItem) -> Result<UpsertOutcome> {
        if let Some(existing) = self.find_by_server_id(incoming.server_id)? {
            if existing.needs_sync {
                // Unsynced auditor edits take precedence over the remote copy
                return Ok(UpsertOutcome::SkippedDirty);
            }
            if !incoming.differs_from(&existing) {
                return Ok(UpsertOutcome::Unchanged);
            }
            self.conn.execute(
                "UPDATE inventory_items
                 SET location_server_id = ?, sku = ?, name = ?, system_qty = ?,
                     physical_qty = ?, biometric_tag = ?, remarks = ?, updated_at = ?
                 WHERE local_id = ?",
                params![
                    incoming.location_server_id,
                    incoming.sku,
                    incoming.name,
                    incoming.system_qty,
                    incoming.physical_qty,
                    incoming.biometric_tag,
                    incoming.remarks,
                    unix_timestamp_ms(),
                    existing.local_id.as_str()
                ],
            )?;
            return Ok(UpsertOutcome::Updated);
        }

        let now = unix_timestamp_ms();
        self.conn.execute(
            "INSERT INTO inventory_items
             (local_id, server_id, location_server_id, sku, name, system_qty,
              physical_qty, biometric_tag, remarks, is_locally_created, needs_sync,
              created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)",
            params![
                ItemId::new().as_str(),
                incoming.server_id,
                incoming.location_server_id,
                incoming.sku,
                incoming.name,
                incoming.system_qty,
                incoming.physical_qty,
                incoming.biometric_tag,
                incoming.remarks,
                now,
                now
            ],
        )?;
        Ok(UpsertOutcome::Inserted)
    }

    fn record_count(
        &self,
        id: &ItemId,
        physical_qty: i64,
        biometric_tag: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<InventoryItem> {
        let rows = self.conn.execute(
            "UPDATE inventory_items
             SET physical_qty = ?, biometric_tag = ?, remarks = ?, needs_sync = 1, updated_at = ?
             WHERE local_id = ?",
            params![
                physical_qty,
                biometric_tag,
                remarks,
                unix_timestamp_ms(),
                id.as_str()
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.find(id)?.ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn mark_synced(&self, id: &ItemId) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE inventory_items SET needs_sync = 0 WHERE local_id = ?",
            params![id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn count_dirty(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM inventory_items WHERE needs_sync = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
