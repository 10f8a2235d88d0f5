use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tally_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Location not found for code: {0}")]
    LocationNotFound(String),
    #[error("Item not found for SKU: {0}")]
    ItemNotFound(String),
    #[error("Report not found for id: {0}")]
    ReportNotFound(String),
    #[error("Counted quantity cannot be negative")]
    NegativeQuantity,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Set TALLY_API_URL, TALLY_API_TOKEN and TALLY_AUDITOR_ID to enable `tally sync`."
    )]
    SyncNotConfigured,
    #[error("Aborted")]
    Aborted,
}
