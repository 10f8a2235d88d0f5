use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tally_core::db::{
    Database, FindingRepository, InventoryRepository, ReportRepository, SqliteFindingRepository,
    SqliteInventoryRepository, SqliteReportRepository,
};

use crate::commands::common::{format_relative_time, open_database, short_id};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PendingEntry {
    pub kind: &'static str,
    pub id: String,
    pub detail: String,
    pub updated_at: i64,
    pub relative_time: String,
}

pub fn run_pending(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let entries = collect_pending(&db)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Nothing pending.");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{:<8}  {:<13}  {:<48}  {}",
            entry.kind, entry.id, entry.detail, entry.relative_time
        );
    }
    Ok(())
}

pub fn collect_pending(db: &Database) -> Result<Vec<PendingEntry>, CliError> {
    let now_ms = Utc::now().timestamp_millis();
    let conn = db.connection();
    let mut entries = Vec::new();

    for report in SqliteReportRepository::new(&conn).list_unpushed_creations()? {
        entries.push(PendingEntry {
            kind: "report",
            id: short_id(&report.local_id),
            detail: format!("new {} report for location {}", report.status, report.location_server_id),
            updated_at: report.updated_at,
            relative_time: format_relative_time(report.updated_at, now_ms),
        });
    }

    for finding in SqliteFindingRepository::new(&conn).list_dirty()? {
        entries.push(PendingEntry {
            kind: "finding",
            id: short_id(&finding.local_id),
            detail: format!(
                "item {} counted {} ({:+})",
                finding.item_server_id, finding.counted_qty, finding.difference
            ),
            updated_at: finding.updated_at,
            relative_time: format_relative_time(finding.updated_at, now_ms),
        });
    }

    for item in SqliteInventoryRepository::new(&conn).list_dirty()? {
        let counted = item
            .physical_qty
            .map_or_else(|| "?".to_string(), |qty| qty.to_string());
        entries.push(PendingEntry {
            kind: "item",
            id: short_id(&item.local_id),
            detail: format!("{} counted {counted} (system {})", item.sku, item.system_qty),
            updated_at: item.updated_at,
            relative_time: format_relative_time(item.updated_at, now_ms),
        });
    }

    entries.sort_by_key(|entry| entry.updated_at);
    Ok(entries)
}
