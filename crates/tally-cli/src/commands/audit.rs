use std::path::Path;

use chrono::Utc;
use tally_core::db::{
    FindingRepository, InventoryRepository, LocationRepository, ReportRepository,
    SqliteFindingRepository, SqliteInventoryRepository, SqliteLocationRepository,
    SqliteReportRepository,
};
use tally_core::models::ReportId;
use tally_core::AuditReport;

use crate::commands::common::{
    auditor_id_from_env, dirty_marker, format_relative_time, open_database, short_id,
};
use crate::error::CliError;

pub fn run_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let auditor_id = auditor_id_from_env()?;
    let db = open_database(db_path)?;
    let reports = {
        let conn = db.connection();
        SqliteReportRepository::new(&conn).list_for_auditor(auditor_id)?
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No audit reports.");
        return Ok(());
    }

    for line in format_report_lines(&reports) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_new(code: &str, db_path: &Path) -> Result<(), CliError> {
    let auditor_id = auditor_id_from_env()?;
    let db = open_database(db_path)?;
    let conn = db.connection();

    let location = SqliteLocationRepository::new(&conn)
        .find_by_code(code)?
        .ok_or_else(|| CliError::LocationNotFound(code.to_string()))?;
    let Some(location_server_id) = location.server_id else {
        return Err(CliError::LocationNotFound(code.to_string()));
    };

    let draft = SqliteReportRepository::new(&conn).create_draft(location_server_id, auditor_id)?;
    println!("{}", draft.local_id);
    Ok(())
}

pub fn run_finding(
    report: &str,
    sku: &str,
    qty: i64,
    tag: Option<&str>,
    remarks: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    if qty < 0 {
        return Err(CliError::NegativeQuantity);
    }

    let db = open_database(db_path)?;
    let conn = db.connection();

    let report_id: ReportId = report
        .parse()
        .map_err(|_| CliError::ReportNotFound(report.to_string()))?;
    let report = SqliteReportRepository::new(&conn)
        .find(&report_id)?
        .ok_or_else(|| CliError::ReportNotFound(report.to_string()))?;

    let item = SqliteInventoryRepository::new(&conn)
        .find_by_sku(sku)?
        .ok_or_else(|| CliError::ItemNotFound(sku.to_string()))?;
    let Some(item_server_id) = item.server_id else {
        return Err(CliError::ItemNotFound(sku.to_string()));
    };

    let difference = qty - item.system_qty;
    let finding = SqliteFindingRepository::new(&conn).record(
        &report.local_id,
        item_server_id,
        qty,
        difference,
        tag,
        remarks,
    )?;

    println!(
        "{}: {sku} counted {qty} (difference {difference:+}); pending push",
        finding.local_id
    );
    Ok(())
}

pub fn format_report_lines(reports: &[AuditReport]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    reports
        .iter()
        .map(|report| {
            format!(
                "{}{:<13}  {:<10}  location {:<6}  {}",
                dirty_marker(report.needs_sync),
                short_id(&report.local_id),
                report.status,
                report.location_server_id,
                format_relative_time(report.updated_at, now_ms)
            )
        })
        .collect()
}
