use std::path::Path;

use tally_core::db::{
    InventoryRepository, LocationRepository, SqliteInventoryRepository, SqliteLocationRepository,
};
use tally_core::InventoryItem;

use crate::commands::common::{dirty_marker, open_database};
use crate::error::CliError;

pub fn run_items(code: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let items = {
        let conn = db.connection();
        let location = SqliteLocationRepository::new(&conn)
            .find_by_code(code)?
            .ok_or_else(|| CliError::LocationNotFound(code.to_string()))?;
        let Some(location_server_id) = location.server_id else {
            return Err(CliError::LocationNotFound(code.to_string()));
        };
        SqliteInventoryRepository::new(&conn).list_by_location(location_server_id)?
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No items for location {code}.");
        return Ok(());
    }

    for line in format_item_lines(&items) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_count(
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
    let repo = SqliteInventoryRepository::new(&conn);

    let item = repo
        .find_by_sku(sku)?
        .ok_or_else(|| CliError::ItemNotFound(sku.to_string()))?;
    let counted = repo.record_count(&item.local_id, qty, tag, remarks)?;

    let difference = counted.difference().unwrap_or(0);
    println!(
        "{sku}: counted {qty} (system {}, difference {difference:+}); pending push",
        counted.system_qty
    );
    Ok(())
}

pub fn format_item_lines(items: &[InventoryItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let counted = item
                .physical_qty
                .map_or_else(|| "-".to_string(), |qty| qty.to_string());
            let difference = item
                .difference()
                .map_or_else(|| "-".to_string(), |diff| format!("{diff:+}"));
            format!(
                "{}{:<16}  {:<32}  system {:<6}  counted {:<6}  diff {}",
                dirty_marker(item.needs_sync),
                item.sku,
                item.name,
                item.system_qty,
                counted,
                difference
            )
        })
        .collect()
}
