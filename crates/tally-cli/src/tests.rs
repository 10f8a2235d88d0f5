use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tally_core::db::{
    Database, InventoryRepository, LocationRepository, ReportRepository,
    SqliteInventoryRepository, SqliteLocationRepository, SqliteReportRepository,
};
use tally_core::models::{PulledItem, PulledLocation};

use crate::commands::common::{format_relative_time, is_affirmative, resolve_db_path};
use crate::commands::items::{format_item_lines, run_count};
use crate::commands::locations::format_location_lines;
use crate::commands::pending::collect_pending;
use crate::commands::wipe::run_wipe;
use crate::error::CliError;

fn temp_db() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.db");
    (dir, path)
}

fn seed_item(path: &Path) {
    let db = Database::open(path).unwrap();
    let conn = db.connection();
    SqliteLocationRepository::new(&conn)
        .upsert_pulled(&PulledLocation {
            server_id: 7,
            code: "B2".to_string(),
            name: "Building 2".to_string(),
            path: "HQ.B2".to_string(),
            depth: 1,
            parent_server_id: Some(1),
        })
        .unwrap();
    SqliteInventoryRepository::new(&conn)
        .upsert_pulled(&PulledItem {
            server_id: 42,
            location_server_id: 7,
            sku: "SKU-42".to_string(),
            name: "Widget".to_string(),
            system_qty: 10,
            physical_qty: None,
            biometric_tag: None,
            remarks: None,
        })
        .unwrap();
}

#[test]
fn resolve_db_path_prefers_explicit_flag() {
    let explicit = PathBuf::from("/tmp/custom.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn is_affirmative_accepts_y_and_yes() {
    assert!(is_affirmative(" y \n"));
    assert!(is_affirmative("YES"));
    assert!(!is_affirmative(""));
    assert!(!is_affirmative("no"));
}

#[test]
fn run_count_marks_item_pending() {
    let (_dir, path) = temp_db();
    seed_item(&path);

    run_count("SKU-42", 8, Some("TAG-9"), None, &path).unwrap();

    let db = Database::open(&path).unwrap();
    let entries = collect_pending(&db).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "item");
    assert!(entries[0].detail.contains("SKU-42 counted 8"));
}

#[test]
fn run_count_rejects_unknown_sku_and_negative_qty() {
    let (_dir, path) = temp_db();
    seed_item(&path);

    assert!(matches!(
        run_count("NOPE", 8, None, None, &path),
        Err(CliError::ItemNotFound(_))
    ));
    assert!(matches!(
        run_count("SKU-42", -1, None, None, &path),
        Err(CliError::NegativeQuantity)
    ));
}

#[test]
fn run_wipe_clears_everything() {
    let (_dir, path) = temp_db();
    seed_item(&path);
    run_count("SKU-42", 8, None, None, &path).unwrap();

    run_wipe(true, &path).unwrap();

    let db = Database::open(&path).unwrap();
    assert!(collect_pending(&db).unwrap().is_empty());
    let conn = db.connection();
    assert!(SqliteLocationRepository::new(&conn).list().unwrap().is_empty());
}

#[test]
fn format_item_lines_shows_counts_and_dirty_marker() {
    let (_dir, path) = temp_db();
    seed_item(&path);
    run_count("SKU-42", 8, None, None, &path).unwrap();

    let db = Database::open(&path).unwrap();
    let conn = db.connection();
    let items = SqliteInventoryRepository::new(&conn)
        .list_by_location(7)
        .unwrap();

    let lines = format_item_lines(&items);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with('*'));
    assert!(lines[0].contains("diff -2"));
}

#[test]
fn format_location_lines_indents_by_depth() {
    let (_dir, path) = temp_db();
    seed_item(&path);

    let db = Database::open(&path).unwrap();
    let conn = db.connection();
    let locations = SqliteLocationRepository::new(&conn).list().unwrap();

    let lines = format_location_lines(&locations);
    assert!(lines[0].starts_with("  B2"));
}

#[test]
fn draft_report_shows_up_in_pending() {
    let (_dir, path) = temp_db();
    seed_item(&path);

    {
        let db = Database::open(&path).unwrap();
        let conn = db.connection();
        SqliteReportRepository::new(&conn).create_draft(7, 3).unwrap();
    }

    let db = Database::open(&path).unwrap();
    let entries = collect_pending(&db).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "report");
}
