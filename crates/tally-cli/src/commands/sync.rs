use std::path::Path;
use std::sync::Arc;

use tally_core::sync::{SchedulerConfig, SyncScheduler};

use crate::commands::common::{build_engine, open_database, require_remote_env};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let engine = Arc::new(build_engine(db, require_remote_env()?)?);
    let scheduler = SyncScheduler::new(engine.clone(), SchedulerConfig::default());

    tracing::info!(db = %db_path.display(), "manual sync requested");
    let pushed = scheduler.sync_now().await?;
    let pending = engine.monitor().pending_count();

    if pending == 0 {
        println!("Sync completed: {pushed} pushed");
    } else {
        println!("Sync completed: {pushed} pushed, {pending} still pending");
    }
    Ok(())
}
