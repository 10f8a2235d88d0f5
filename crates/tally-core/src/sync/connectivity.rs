//! Connectivity monitor
//!
//! Pure observability and gating state for the sync protocols: two
//! reachability axes (OS network events feed one, a health probe feeds the
//! other), the scheduler-owned syncing flag, and the pending-change count.
//! No record merging happens here.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::api::RemoteService;

/// Point-in-time view of the monitor, as surfaced to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// OS-level network reachability
    pub network_reachable: bool,
    /// Remote health endpoint responded on the last probe
    pub service_reachable: bool,
    /// A sync cycle is currently running
    pub is_syncing: bool,
    /// Dirty reports + findings + items awaiting push
    pub pending_count: u64,
    /// Most recent pull/push watermark (Unix ms)
    pub last_synced_at: Option<i64>,
}

/// Shared connectivity and sync-progress state.
///
/// All fields are atomics so the UI can read a consistent-enough snapshot
/// without taking any lock the sync engine holds.
pub struct ConnectivityMonitor {
    network_reachable: AtomicBool,
    service_reachable: AtomicBool,
    is_syncing: AtomicBool,
    pending_count: AtomicU64,
    // 0 = never synced
    last_synced_at: AtomicI64,
}

impl ConnectivityMonitor {
    /// Create a monitor assuming the network is up until told otherwise.
    ///
    /// The service axis starts false and flips on the first health probe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            network_reachable: AtomicBool::new(true),
            service_reachable: AtomicBool::new(false),
            is_syncing: AtomicBool::new(false),
            pending_count: AtomicU64::new(0),
            last_synced_at: AtomicI64::new(0),
        }
    }

    /// Feed an OS-level network change event.
    ///
    /// Returns true on an offline-to-online transition, which the scheduler
    /// uses as its connectivity-restored trigger. Going offline forces the
    /// service axis false without probing.
    pub fn set_network_reachable(&self, reachable: bool) -> bool {
        let was = self.network_reachable.swap(reachable, Ordering::SeqCst);
        if !reachable {
            self.service_reachable.store(false, Ordering::SeqCst);
        }
        reachable && !was
    }

    /// Current OS-level network reachability
    pub fn network_reachable(&self) -> bool {
        self.network_reachable.load(Ordering::SeqCst)
    }

    /// Whether the remote service answered the last health probe
    pub fn service_reachable(&self) -> bool {
        self.service_reachable.load(Ordering::SeqCst)
    }

    /// Both axes up: a network attempt is considered safe
    pub fn is_online(&self) -> bool {
        self.network_reachable() && self.service_reachable()
    }

    /// Set exclusively by the scheduler around a cycle
    pub fn set_syncing(&self, syncing: bool) {
        self.is_syncing.store(syncing, Ordering::SeqCst);
    }

    /// Whether a sync cycle is currently running
    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }

    /// Publish a freshly recomputed dirty-record count
    pub fn set_pending_count(&self, count: u64) {
        self.pending_count.store(count, Ordering::SeqCst);
    }

    /// Dirty records awaiting push, as of the last recount
    pub fn pending_count(&self) -> u64 {
        self.pending_count.load(Ordering::SeqCst)
    }

    /// Publish the latest sync watermark
    pub fn record_synced_at(&self, timestamp: Option<i64>) {
        self.last_synced_at
            .store(timestamp.unwrap_or(0), Ordering::SeqCst);
    }

    /// Point-in-time view for the UI
    pub fn snapshot(&self) -> SyncStatus {
        let last = self.last_synced_at.load(Ordering::SeqCst);
        SyncStatus {
            network_reachable: self.network_reachable(),
            service_reachable: self.service_reachable(),
            is_syncing: self.is_syncing(),
            pending_count: self.pending_count(),
            last_synced_at: (last != 0).then_some(last),
        }
    }

    /// Run one health probe and update the service axis.
    ///
    /// When the network is down the service is marked unreachable without
    /// touching the wire.
    pub async fn probe<R: RemoteService>(&self, remote: &R) -> bool {
        if !self.network_reachable() {
            self.service_reachable.store(false, Ordering::SeqCst);
            return false;
        }

        let reachable = match remote.health().await {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(%error, "health probe failed");
                false
            }
        };
        self.service_reachable.store(reachable, Ordering::SeqCst);
        reachable
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe the remote health endpoint on a fixed interval until the task is
/// dropped. Spawn alongside the scheduler's periodic loop.
pub async fn run_probe_loop<R: RemoteService>(
    monitor: Arc<ConnectivityMonitor>,
    remote: R,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        monitor.probe(&remote).await;
    }
}
