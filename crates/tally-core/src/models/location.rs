//! Location model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique local identifier for a location, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(Uuid);

impl LocationId {
    /// Create a new unique location ID using UUID v7
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

impl Default for LocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A physical location in the audited hierarchy.
///
/// Locations are read-mostly: the client never creates them locally, so they
/// arrive exclusively through Pull and are always clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Stable local identifier, never reassigned
    pub local_id: LocationId,
    /// Remote identifier, assigned at pull time
    pub server_id: Option<i64>,
    /// Short location code (unique within the hierarchy)
    pub code: String,
    /// Display name
    pub name: String,
    /// Materialized path: dot-delimited ancestor codes
    pub path: String,
    /// Depth in the hierarchy (root = 0)
    pub depth: i64,
    /// Remote id of the parent location, if any
    pub parent_server_id: Option<i64>,
    /// True until the record has been pushed as a creation
    pub is_locally_created: bool,
    /// True whenever local state has diverged from the last synced state
    pub needs_sync: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Location {
    /// Ancestor codes from the materialized path, root first
    #[must_use]
    pub fn ancestor_codes(&self) -> Vec<&str> {
        if self.path.is_empty() {
            Vec::new()
        } else {
            self.path.split('.').collect()
        }
    }

    /// Whether this location is a hierarchy root
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_server_id.is_none()
    }
}

/// Server-sourced view of a location, as merged by Pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledLocation {
    pub server_id: i64,
    pub code: String,
    pub name: String,
    pub path: String,
    pub depth: i64,
    pub parent_server_id: Option<i64>,
}

impl PulledLocation {
    /// Whether the remote fields differ from the locally stored record
    #[must_use]
    pub fn differs_from(&self, local: &Location) -> bool {
        self.code != local.code
            || self.name != local.name
            || self.path != local.path
            || self.depth != local.depth
            || self.parent_server_id != local.parent_server_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Location {
        Location {
            local_id: LocationId::new(),
            server_id: Some(7),
            code: "B2".to_string(),
            name: "Building 2".to_string(),
            path: "HQ.B2".to_string(),
            depth: 1,
            parent_server_id: Some(1),
            is_locally_created: false,
            needs_sync: false,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_location_id_unique() {
        assert_ne!(LocationId::new(), LocationId::new());
    }

    #[test]
    fn test_location_id_parse() {
        let id = LocationId::new();
        let parsed: LocationId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_ancestor_codes() {
        let location = sample();
        assert_eq!(location.ancestor_codes(), vec!["HQ", "B2"]);
    }

    #[test]
    fn test_ancestor_codes_empty_path() {
        let mut location = sample();
        location.path = String::new();
        assert!(location.ancestor_codes().is_empty());
    }

    #[test]
    fn test_differs_from_detects_renames() {
        let local = sample();
        let mut pulled = PulledLocation {
            server_id: 7,
            code: local.code.clone(),
            name: local.name.clone(),
            path: local.path.clone(),
            depth: local.depth,
            parent_server_id: local.parent_server_id,
        };
        assert!(!pulled.differs_from(&local));

        pulled.name = "Building Two".to_string();
        assert!(pulled.differs_from(&local));
    }
}
