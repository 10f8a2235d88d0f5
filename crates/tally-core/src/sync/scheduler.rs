//! Sync scheduler
//!
//! Owns every trigger that starts a cycle: login, a periodic timer,
//! connectivity restoration, and the manual sync action. At most one cycle
//! runs at a time; a trigger that fires mid-cycle is dropped rather than
//! queued. A corrupted local store detected during a cycle is wiped and
//! rebuilt empty.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::api::RemoteService;
use crate::error::Result;

use super::SyncEngine;

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Timer settings for the background loops
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// How often the periodic push trigger fires
    pub sync_interval: Duration,
    /// How often the connectivity monitor probes the health endpoint
    pub probe_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum CycleKind {
    PullThenPush,
    PushOnly,
}

/// Serializes sync cycles over one engine
pub struct SyncScheduler<R: RemoteService> {
    engine: Arc<SyncEngine<R>>,
    config: SchedulerConfig,
    cycle_lock: Mutex<()>,
}

impl<R: RemoteService> SyncScheduler<R> {
    /// Create a scheduler over the given engine
    pub fn new(engine: Arc<SyncEngine<R>>, config: SchedulerConfig) -> Self {
        Self {
            engine,
            config,
            cycle_lock: Mutex::new(()),
        }
    }

    /// The engine this scheduler drives
    pub const fn engine(&self) -> &Arc<SyncEngine<R>> {
        &self.engine
    }

    /// Run once after successful authentication: full pull, then push.
    /// Failures are logged; the periodic trigger retries.
    pub async fn on_login(&self) {
        if let Err(error) = self.run_cycle(CycleKind::PullThenPush).await {
            tracing::warn!(%error, "login sync failed; will retry on the next trigger");
        }
    }

    /// Manual sync. Returns the number of records pushed.
    ///
    /// Errors surface only when the pull failed before processing anything
    /// or the store is unusable beyond recovery.
    pub async fn sync_now(&self) -> Result<usize> {
        self.run_cycle(CycleKind::PullThenPush).await
    }

    /// Push if anything is pending. The periodic timer's trigger.
    pub async fn push_if_pending(&self) {
        let pending = match self.engine.refresh_status() {
            Ok(pending) => pending,
            Err(error) if error.is_corruption() => {
                if let Err(error) = self.engine.recover_corrupted() {
                    tracing::error!(%error, "store recovery failed");
                }
                return;
            }
            Err(error) => {
                tracing::warn!(%error, "pending recount failed; skipping this tick");
                return;
            }
        };
        if pending == 0 {
            return;
        }

        if let Err(error) = self.run_cycle(CycleKind::PushOnly).await {
            tracing::warn!(%error, "periodic push failed; will retry on the next tick");
        }
    }

    /// Push immediately after an offline-to-online transition
    pub async fn on_connectivity_restored(&self) {
        if let Err(error) = self.run_cycle(CycleKind::PushOnly).await {
            tracing::warn!(%error, "post-restore push failed; will retry on the next tick");
        }
    }

    /// Drive the periodic push trigger until the task is dropped
    pub async fn run_periodic(&self) {
        let mut ticker = tokio::time::interval(self.config.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; login already synced
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.push_if_pending().await;
        }
    }

    async fn run_cycle(&self, kind: CycleKind) -> Result<usize> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::debug!("sync cycle already running; trigger dropped");
            return Ok(0);
        };

        let monitor = self.engine.monitor();
        monitor.set_syncing(true);
        let result = self.run_cycle_inner(kind).await;
        monitor.set_syncing(false);

        match result {
            Err(error) if error.is_corruption() => {
                tracing::error!(%error, "local store corrupted during sync");
                self.engine.recover_corrupted()?;
                Ok(0)
            }
            other => other,
        }
    }

    async fn run_cycle_inner(&self, kind: CycleKind) -> Result<usize> {
        if matches!(kind, CycleKind::PullThenPush) {
            self.engine.pull().await?;
        }
        self.engine.push().await
    }
}
