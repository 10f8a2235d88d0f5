//! Audit finding model

use crate::models::ReportId;
use crate::util::unix_timestamp_ms;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique local identifier for an audit finding, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingId(Uuid);

impl FindingId {
    /// Create a new unique finding ID using UUID v7
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

impl Default for FindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FindingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One audited line inside a report, referencing exactly one inventory item.
///
/// The remote service keys findings by report + item, so local create and
/// update collapse into a single upsert on push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
    /// Stable local identifier, never reassigned
    pub local_id: FindingId,
    /// Remote identifier: set at pull time, or after a successful push
    pub server_id: Option<i64>,
    /// Local id of the parent report
    pub report_local_id: ReportId,
    /// Remote id of the audited inventory item
    pub item_server_id: i64,
    /// Physically counted quantity
    pub counted_qty: i64,
    /// Counted-minus-book difference at count time
    pub difference: i64,
    /// Biometric/QR tag captured during the count
    pub biometric_tag: Option<String>,
    /// Free-form remarks
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

impl AuditFinding {
    /// Create a local finding awaiting its first push
    #[must_use]
    pub fn new(
        report_local_id: ReportId,
        item_server_id: i64,
        counted_qty: i64,
        difference: i64,
        biometric_tag: Option<String>,
        remarks: Option<String>,
    ) -> Self {
        let now = unix_timestamp_ms();
        Self {
            local_id: FindingId::new(),
            server_id: None,
            report_local_id,
            item_server_id,
            counted_qty,
            difference,
            biometric_tag,
            remarks,
            is_locally_created: true,
            needs_sync: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Server-sourced view of a finding, as merged by Pull.
///
/// The parent is identified by its remote id; Pull resolves it to a local
/// report before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledFinding {
    pub server_id: i64,
    pub report_server_id: i64,
    pub item_server_id: i64,
    pub counted_qty: i64,
    pub difference: i64,
    pub biometric_tag: Option<String>,
    pub remarks: Option<String>,
}

impl PulledFinding {
    /// Whether the remote fields differ from the locally stored record
    #[must_use]
    pub fn differs_from(&self, local: &AuditFinding) -> bool {
        self.item_server_id != local.item_server_id
            || self.counted_qty != local.counted_qty
            || self.difference != local.difference
            || self.biometric_tag != local.biometric_tag
            || self.remarks != local.remarks
    }
}
