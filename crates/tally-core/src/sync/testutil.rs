//! In-memory `RemoteService` for engine and scheduler tests
//!
//! Backed by shared mutable state so tests can seed server data, inject
//! per-endpoint failures, and inspect what the engine sent. An optional
//! per-call delay makes cycle overlap observable.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{
    FindingPayload, ItemAuditPatch, RemoteAuditReport, RemoteFinding, RemoteInventoryItem,
    RemoteLocation, RemoteService,
};
use crate::error::{Error, Result};
use crate::models::AuditStatus;

/// Per-endpoint call counters
#[derive(Debug, Default, Clone, Copy)]
pub struct CallCounts {
    pub fetch_locations: usize,
    pub fetch_inventory: usize,
    pub fetch_audits: usize,
    pub fetch_audit: usize,
    pub create_audit: usize,
    pub push_finding: usize,
    pub update_item: usize,
    pub health: usize,
}

/// Everything the fake server knows, plus failure switches
pub struct FakeState {
    pub locations: Vec<RemoteLocation>,
    pub inventory: HashMap<i64, Vec<RemoteInventoryItem>>,
    pub audits: Vec<RemoteAuditReport>,
    pub auditor_id: i64,
    next_id: i64,

    // What the engine sent
    pub created_audits: Vec<(i64, i64)>,
    pub pushed_findings: Vec<(i64, FindingPayload)>,
    pub patched_items: Vec<(i64, ItemAuditPatch)>,
    pub calls: CallCounts,

    // Failure switches
    pub fail_locations: bool,
    pub fail_create_audit: bool,
    pub fail_health: bool,
    pub fail_inventory_locations: HashSet<i64>,
    pub fail_finding_items: HashSet<i64>,
    pub fail_item_patches: HashSet<i64>,

    /// Artificial latency applied before every call
    pub delay: Option<Duration>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            inventory: HashMap::new(),
            audits: Vec::new(),
            auditor_id: 3,
            next_id: 1000,
            created_audits: Vec::new(),
            pushed_findings: Vec::new(),
            patched_items: Vec::new(),
            calls: CallCounts::default(),
            fail_locations: false,
            fail_create_audit: false,
            fail_health: false,
            fail_inventory_locations: HashSet::new(),
            fail_finding_items: HashSet::new(),
            fail_item_patches: HashSet::new(),
            delay: None,
        }
    }
}

impl FakeState {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Cloneable handle over shared fake-server state
#[derive(Clone, Default)]
pub struct FakeRemote {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_location(&self, id: i64, code: &str) {
        self.state.lock().unwrap().locations.push(RemoteLocation {
            id,
            code: code.to_string(),
            name: format!("Location {code}"),
            path: format!("HQ.{code}"),
            depth: 1,
            parent_id: Some(1),
        });
    }

    pub fn add_item(&self, location_id: i64, id: i64, sku: &str, system_qty: i64) {
        self.state
            .lock()
            .unwrap()
            .inventory
            .entry(location_id)
            .or_default()
            .push(RemoteInventoryItem {
                id,
                location_id,
                sku: sku.to_string(),
                name: format!("Item {sku}"),
                system_qty,
                physical_qty: None,
                biometric_tag: None,
                remarks: None,
            });
    }

    pub fn add_audit(&self, id: i64, location_id: i64, auditor_id: i64, status: AuditStatus) {
        self.state.lock().unwrap().audits.push(RemoteAuditReport {
            id,
            location_id,
            auditor_id,
            status,
            findings: Vec::new(),
        });
    }

    pub fn add_finding(&self, report_id: i64, id: i64, item_id: i64, counted_qty: i64, difference: i64) {
        let mut state = self.state.lock().unwrap();
        let audit = state
            .audits
            .iter_mut()
            .find(|a| a.id == report_id)
            .expect("audit must be seeded before its findings");
        audit.findings.push(RemoteFinding {
            id,
            report_id,
            item_id,
            counted_qty,
            difference,
            biometric_tag: None,
            remarks: None,
        });
    }

    async fn pause(&self) {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn rejection(what: &str) -> Error {
    Error::Api {
        status: 503,
        message: format!("{what} unavailable"),
    }
}

impl RemoteService for FakeRemote {
    async fn fetch_locations(&self) -> Result<Vec<RemoteLocation>> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_locations += 1;
        if state.fail_locations {
            return Err(rejection("locations"));
        }
        Ok(state.locations.clone())
    }

    async fn fetch_inventory(&self, location_id: i64) -> Result<Vec<RemoteInventoryItem>> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_inventory += 1;
        if state.fail_inventory_locations.contains(&location_id) {
            return Err(rejection("inventory"));
        }
        Ok(state.inventory.get(&location_id).cloned().unwrap_or_default())
    }

    async fn fetch_audits(&self, auditor_id: i64) -> Result<Vec<RemoteAuditReport>> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_audits += 1;
        // The list endpoint omits embedded findings
        Ok(state
            .audits
            .iter()
            .filter(|a| a.auditor_id == auditor_id)
            .cloned()
            .map(|mut a| {
                a.findings.clear();
                a
            })
            .collect())
    }

    async fn fetch_audit(&self, report_id: i64) -> Result<RemoteAuditReport> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_audit += 1;
        state
            .audits
            .iter()
            .find(|a| a.id == report_id)
            .cloned()
            .ok_or_else(|| Error::Api {
                status: 404,
                message: format!("audit {report_id} not found"),
            })
    }

    async fn create_audit(&self, location_id: i64) -> Result<RemoteAuditReport> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.create_audit += 1;
        if state.fail_create_audit {
            return Err(rejection("audit creation"));
        }
        let id = state.alloc_id();
        let auditor_id = state.auditor_id;
        let report = RemoteAuditReport {
            id,
            location_id,
            auditor_id,
            status: AuditStatus::Draft,
            findings: Vec::new(),
        };
        state.audits.push(report.clone());
        state.created_audits.push((id, location_id));
        Ok(report)
    }

    async fn push_finding(
        &self,
        report_id: i64,
        payload: &FindingPayload,
    ) -> Result<RemoteFinding> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push_finding += 1;
        if state.fail_finding_items.contains(&payload.item_id) {
            return Err(rejection("finding"));
        }

        // Create-or-update keyed by report + item, like the real service
        let existing_id = state
            .audits
            .iter()
            .find(|a| a.id == report_id)
            .and_then(|a| a.findings.iter().find(|f| f.item_id == payload.item_id))
            .map(|f| f.id);
        let id = existing_id.unwrap_or_else(|| {
            let id = state.next_id + 1;
            state.next_id = id;
            id
        });
        let finding = RemoteFinding {
            id,
            report_id,
            item_id: payload.item_id,
            counted_qty: payload.counted_qty,
            difference: payload.difference,
            biometric_tag: payload.biometric_tag.clone(),
            remarks: payload.remarks.clone(),
        };

        if let Some(audit) = state.audits.iter_mut().find(|a| a.id == report_id) {
            if let Some(existing) = audit
                .findings
                .iter_mut()
                .find(|f| f.item_id == payload.item_id)
            {
                *existing = finding.clone();
            } else {
                audit.findings.push(finding.clone());
            }
        }
        state.pushed_findings.push((report_id, payload.clone()));
        Ok(finding)
    }

    async fn update_item(&self, item_id: i64, patch: &ItemAuditPatch) -> Result<()> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.update_item += 1;
        if state.fail_item_patches.contains(&item_id) {
            return Err(rejection("item patch"));
        }

        for items in state.inventory.values_mut() {
            if let Some(item) = items.iter_mut().find(|i| i.id == item_id) {
                item.physical_qty = patch.physical_qty;
                item.biometric_tag = patch.biometric_tag.clone();
                item.remarks = patch.remarks.clone();
            }
        }
        state.patched_items.push((item_id, patch.clone()));
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.health += 1;
        if state.fail_health {
            return Err(rejection("health"));
        }
        Ok(())
    }
}
