use std::path::Path;

use tally_core::db::count_pending;

use crate::commands::common::{confirm, open_database};
use crate::error::CliError;

pub fn run_wipe(assume_yes: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;

    let pending = {
        let conn = db.connection();
        count_pending(&conn)?
    };

    if !assume_yes {
        let prompt = if pending > 0 {
            format!("Wipe all local data? {pending} unsynced change(s) will be LOST.")
        } else {
            "Wipe all local data?".to_string()
        };
        if !confirm(&prompt)? {
            return Err(CliError::Aborted);
        }
    }

    db.wipe()?;
    tracing::info!(discarded = pending, "local store wiped");
    println!("Local data wiped.");
    Ok(())
}
