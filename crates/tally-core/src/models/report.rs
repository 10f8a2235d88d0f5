//! Audit report model

use crate::util::unix_timestamp_ms;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique local identifier for an audit report, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(Uuid);

impl ReportId {
    /// Create a new unique report ID using UUID v7
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

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReportId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Audit report lifecycle status.
///
/// Remote-owned after submission; the client only ever creates drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// Being worked on by the auditor
    #[default]
    Draft,
    /// Handed over for review
    Submitted,
    /// Accepted by a reviewer
    Approved,
    /// Sent back by a reviewer
    Rejected,
}

impl AuditStatus {
    /// Database/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown audit status: {other}")),
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit report tying one auditor to one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Stable local identifier, never reassigned
    pub local_id: ReportId,
    /// Remote identifier: set at pull time, or after a successful create-push
    pub server_id: Option<i64>,
    /// Remote id of the audited location
    pub location_server_id: i64,
    /// Remote id of the assigned auditor
    pub auditor_id: i64,
    /// Lifecycle status
    pub status: AuditStatus,
    /// True until the record has been pushed as a creation
    pub is_locally_created: bool,
    /// True whenever local state has diverged from the last synced state
    pub needs_sync: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl AuditReport {
    /// Create a local draft awaiting its first push
    #[must_use]
    pub fn new_draft(location_server_id: i64, auditor_id: i64) -> Self {
        let now = unix_timestamp_ms();
        Self {
            local_id: ReportId::new(),
            server_id: None,
            location_server_id,
            auditor_id,
            status: AuditStatus::Draft,
            is_locally_created: true,
            needs_sync: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Server-sourced view of an audit report, as merged by Pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledReport {
    pub server_id: i64,
    pub location_server_id: i64,
    pub auditor_id: i64,
    pub status: AuditStatus,
}

impl PulledReport {
    /// Whether the remote fields differ from the locally stored record
    #[must_use]
    pub fn differs_from(&self, local: &AuditReport) -> bool {
        self.location_server_id != local.location_server_id
            || self.auditor_id != local.auditor_id
            || self.status != local.status
    }
}
