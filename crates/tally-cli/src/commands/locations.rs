use std::path::Path;

use tally_core::db::{LocationRepository, SqliteLocationRepository};
use tally_core::Location;

use crate::commands::common::open_database;
use crate::error::CliError;

pub fn run_locations(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let locations = {
        let conn = db.connection();
        SqliteLocationRepository::new(&conn).list()?
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&locations)?);
        return Ok(());
    }

    if locations.is_empty() {
        println!("No locations. Run `tally sync` first.");
        return Ok(());
    }

    for line in format_location_lines(&locations) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_location_lines(locations: &[Location]) -> Vec<String> {
    locations
        .iter()
        .map(|location| {
            let indent = "  ".repeat(usize::try_from(location.depth).unwrap_or(0));
            format!("{indent}{:<8}  {}", location.code, location.name)
        })
        .collect()
}
