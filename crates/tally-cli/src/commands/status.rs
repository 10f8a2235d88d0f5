use std::path::Path;

use chrono::Utc;
use tally_core::db::{count_pending, SqliteSyncMetaRepository, SyncMetaRepository};
use tally_core::sync::SyncStatus;

use crate::commands::common::{build_engine, format_relative_time, open_database, remote_env};
use crate::error::CliError;

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;

    let status = if let Some(remote) = remote_env()? {
        // Probe the service so the snapshot reflects reality, not the default
        let engine = build_engine(db, remote)?;
        engine.monitor().probe(engine.remote()).await;
        engine.refresh_status()?;
        engine.monitor().snapshot()
    } else {
        let conn = db.connection();
        let pending_count = count_pending(&conn)?;
        let last_synced_at = SqliteSyncMetaRepository::new(&conn).last_synced_at()?;
        SyncStatus {
            network_reachable: false,
            service_reachable: false,
            is_syncing: false,
            pending_count,
            last_synced_at,
        }
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    for line in format_status_lines(&status) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_status_lines(status: &SyncStatus) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    let last_synced = status.last_synced_at.map_or_else(
        || "never".to_string(),
        |at| format_relative_time(at, now_ms),
    );

    vec![
        format!("network:     {}", reachability(status.network_reachable)),
        format!("service:     {}", reachability(status.service_reachable)),
        format!("syncing:     {}", if status.is_syncing { "yes" } else { "no" }),
        format!("pending:     {}", status.pending_count),
        format!("last synced: {last_synced}"),
    ]
}

const fn reachability(reachable: bool) -> &'static str {
    if reachable {
        "reachable"
    } else {
        "unreachable"
    }
}
