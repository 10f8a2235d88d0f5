//! Error types for tally-core

use thiserror::Error;

/// Result type alias using tally-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tally-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Local store schema mismatch or on-disk corruption.
    ///
    /// The one fatal-to-the-store condition: callers must wipe and rebuild
    /// the local store rather than retry.
    #[error("Local store corrupted: {0}")]
    StoreCorrupted(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure (connect error, timeout). Transient; the
    /// affected records stay dirty and are retried on the next cycle.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote service returned a non-success status for a specific request
    #[error("Remote service error: {message} ({status})")]
    Api { status: u16, message: String },

    /// Unexpected shape in a remote payload
    #[error("Unexpected remote payload: {0}")]
    InvalidPayload(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Transient network failure: safe to leave records dirty and retry.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Per-record rejection by the remote service (4xx/5xx business error).
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Local store corruption requiring a full wipe and re-pull.
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::StoreCorrupted(_))
    }

    /// Coarse failure class, used as a log field by the sync engine.
    pub const fn class(&self) -> &'static str {
        if self.is_corruption() {
            "corruption"
        } else if self.is_transient() {
            "transient"
        } else if self.is_rejection() {
            "rejection"
        } else {
            "other"
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        if is_schema_mismatch(&error) {
            Self::StoreCorrupted(error.to_string())
        } else {
            Self::Sqlite(error)
        }
    }
}

/// Classify SQLite failures that indicate the store itself is unusable.
///
/// Covers on-disk corruption result codes and malformed-schema query errors
/// (missing tables/columns), which the sync engine treats as a signal to
/// wipe and rebuild from the remote source of truth.
fn is_schema_mismatch(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(code, message) => {
            matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase
            ) || message.as_deref().is_some_and(|m| {
                m.contains("no such table")
                    || m.contains("no such column")
                    || m.contains("malformed")
            })
        }
        // A stored value that no longer parses (mangled id, unknown status)
        rusqlite::Error::FromSqlConversionFailure(..) => true,
        _ => false,
    }
}
