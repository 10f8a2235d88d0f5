//! Offline-first sync engine
//!
//! Pull merges server state into the local store without clobbering unsynced
//! edits; Push replays local changes in dependency order. The scheduler
//! decides when either runs and guarantees a single cycle at a time.

pub mod connectivity;
mod pull;
mod push;
mod scheduler;
#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;

pub use connectivity::{run_probe_loop, ConnectivityMonitor, SyncStatus};
pub use pull::PullSummary;
pub use scheduler::{SchedulerConfig, SyncScheduler};

use crate::api::RemoteService;
use crate::db::{self, Database, SqliteSyncMetaRepository, SyncMetaRepository};
use crate::error::Result;

/// The sync engine: owns the pull and push protocols over one local store
/// and one remote service.
pub struct SyncEngine<R: RemoteService> {
    db: Arc<Database>,
    remote: R,
    auditor_id: i64,
    monitor: Arc<ConnectivityMonitor>,
}

impl<R: RemoteService> SyncEngine<R> {
    /// Create an engine for the authenticated auditor
    pub fn new(
        db: Arc<Database>,
        remote: R,
        auditor_id: i64,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            db,
            remote,
            auditor_id,
            monitor,
        }
    }

    /// The shared connectivity monitor
    pub const fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// The underlying local store
    pub const fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// The remote service this engine syncs against
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Recount dirty records and republish the monitor's pending count and
    /// last-synced watermark. Returns the pending count.
    pub fn refresh_status(&self) -> Result<u64> {
        let (pending, last_synced) = {
            let conn = self.db.connection();
            let pending = db::count_pending(&conn)?;
            let last_synced = SqliteSyncMetaRepository::new(&conn).last_synced_at()?;
            (pending, last_synced)
        };
        self.monitor.set_pending_count(pending);
        self.monitor.record_synced_at(last_synced);
        Ok(pending)
    }

    /// Recover from a corrupted local store: wipe everything and start from
    /// an empty schema. Unsynced local changes are lost; the next pull
    /// repopulates server state.
    pub fn recover_corrupted(&self) -> Result<()> {
        tracing::error!("local store unusable; wiping and rebuilding the schema");
        self.db.wipe()?;
        self.monitor.set_pending_count(0);
        self.monitor.record_synced_at(None);
        Ok(())
    }
}
