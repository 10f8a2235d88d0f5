//! Inventory item model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique local identifier for an inventory item, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new unique item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An inventory item assigned to exactly one location.
///
/// Only the auditor-editable fields (`physical_qty`, `biometric_tag`,
/// `remarks`) may be mutated on the device; everything else is remote-owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Stable local identifier, never reassigned
    pub local_id: ItemId,
    /// Remote identifier, assigned at pull time
    pub server_id: Option<i64>,
    /// Remote id of the owning location
    pub location_server_id: i64,
    /// Stock-keeping code
    pub sku: String,
    /// Display name
    pub name: String,
    /// Book quantity according to the remote service
    pub system_qty: i64,
    /// Physically counted quantity (auditor-editable)
    pub physical_qty: Option<i64>,
    /// Biometric/QR tag captured during the audit (auditor-editable)
    pub biometric_tag: Option<String>,
    /// Free-form remarks (auditor-editable)
    pub remarks: Option<String>,
    /// True until the record has been pushed as a creation
    pub is_locally_created: bool,
    /// True whenever local state has diverged from the last synced state
    pub needs_sync: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl InventoryItem {
    /// Counted-minus-book difference, once a physical count exists
    #[must_use]
    pub fn difference(&self) -> Option<i64> {
        self.physical_qty.map(|qty| qty - self.system_qty)
    }

    /// Whether the auditor has recorded a physical count
    #[must_use]
    pub const fn is_counted(&self) -> bool {
        self.physical_qty.is_some()
    }
}

/// Server-sourced view of an inventory item, as merged by Pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledItem {
    pub server_id: i64,
    pub location_server_id: i64,
    pub sku: String,
    pub name: String,
    pub system_qty: i64,
    pub physical_qty: Option<i64>,
    pub biometric_tag: Option<String>,
    pub remarks: Option<String>,
}

impl PulledItem {
    /// Whether the remote fields differ from the locally stored record
    #[must_use]
    pub fn differs_from(&self, local: &InventoryItem) -> bool {
        self.location_server_id != local.location_server_id
            || self.sku != local.sku
            || self.name != local.name
            || self.system_qty != local.system_qty
            || self.physical_qty != local.physical_qty
            || self.biometric_tag != local.biometric_tag
            || self.remarks != local.remarks
    }
}
