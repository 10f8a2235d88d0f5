use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Offline-first inventory auditing for field work")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show connectivity, pending changes, and the last sync time
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull remote changes, then push local ones
    Sync,
    /// List local records awaiting push
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List synchronized locations
    Locations {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List inventory items for a location
    Items {
        /// Location code, e.g. B2
        code: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a physical count for an item
    Count {
        /// Item SKU
        sku: String,
        /// Counted quantity
        qty: i64,
        /// Biometric verification tag
        #[arg(long)]
        tag: Option<String>,
        /// Free-form remarks
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Work with audit reports
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
    /// Wipe all local data (logout)
    Wipe {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// List audit reports assigned to the auditor
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a local draft report for a location
    New {
        /// Location code
        code: String,
    },
    /// Record a finding against a report
    Finding {
        /// Report local id
        report: String,
        /// Item SKU
        sku: String,
        /// Counted quantity
        qty: i64,
        /// Biometric verification tag
        #[arg(long)]
        tag: Option<String>,
        /// Free-form remarks
        #[arg(long)]
        remarks: Option<String>,
    },
}
