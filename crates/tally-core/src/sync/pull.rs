//! Pull protocol: server state into the local store
//!
//! Merge order follows the dependency chain: locations, then inventory per
//! location, then audit reports, then each report's findings. Each entity
//! batch is written in one transaction. Only a failure to fetch the location
//! list aborts the pull; every later failure is logged and skipped so one
//! bad endpoint cannot starve the rest of the dataset.

use crate::api::RemoteService;
use crate::db::{
    FindingRepository, InventoryRepository, LocationRepository, ReportRepository,
    SqliteFindingRepository, SqliteInventoryRepository, SqliteLocationRepository,
    SqliteReportRepository, SqliteSyncMetaRepository, SyncMetaRepository, UpsertOutcome,
};
use crate::error::Result;
use crate::util::unix_timestamp_ms;

use super::SyncEngine;

/// What one pull applied to the local store
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PullSummary {
    /// Locations inserted or updated
    pub locations: usize,
    /// Inventory items inserted or updated
    pub items: usize,
    /// Audit reports inserted or updated
    pub reports: usize,
    /// Findings inserted or updated
    pub findings: usize,
    /// Records withheld because the local copy has unsynced edits
    pub skipped_dirty: usize,
}

impl PullSummary {
    fn tally(&mut self, outcome: UpsertOutcome, applied: fn(&mut Self) -> &mut usize) {
        match outcome {
            UpsertOutcome::Inserted | UpsertOutcome::Updated => *applied(self) += 1,
            UpsertOutcome::Unchanged => {}
            UpsertOutcome::SkippedDirty => self.skipped_dirty += 1,
        }
    }
}

impl<R: RemoteService> SyncEngine<R> {
    /// Run one pull.
    ///
    /// Returns an error only when the location fetch fails (nothing was
    /// processed yet) or the local store is unusable. The pull watermark is
    /// stamped even after partial per-endpoint failures.
    pub async fn pull(&self) -> Result<PullSummary> {
        let mut summary = PullSummary::default();

        let locations = self.remote.fetch_locations().await?;
        {
            let mut conn = self.db.connection();
            let tx = conn.transaction()?;
            {
                let repo = SqliteLocationRepository::new(&tx);
                for location in locations.iter().cloned() {
                    let outcome = repo.upsert_pulled(&location.into_pulled())?;
                    summary.tally(outcome, |s| &mut s.locations);
                }
            }
            tx.commit()?;
        }

        // Everything past the location list is best effort
        for location in &locations {
            match self.remote.fetch_inventory(location.id).await {
                Ok(items) => {
                    let mut conn = self.db.connection();
                    let tx = conn.transaction()?;
                    {
                        let repo = SqliteInventoryRepository::new(&tx);
                        for item in items {
                            if item.location_id != location.id {
                                tracing::warn!(
                                    item = item.id,
                                    location = location.id,
                                    "inventory row scoped to a different location; skipping"
                                );
                                continue;
                            }
                            let outcome = repo.upsert_pulled(&item.into_pulled())?;
                            summary.tally(outcome, |s| &mut s.items);
                        }
                    }
                    tx.commit()?;
                }
                Err(error) => {
                    tracing::warn!(
                        location = location.id,
                        class = error.class(),
                        %error,
                        "inventory fetch failed; continuing with the next location"
                    );
                }
            }
        }

        match self.remote.fetch_audits(self.auditor_id).await {
            Ok(reports) => {
                {
                    let mut conn = self.db.connection();
                    let tx = conn.transaction()?;
                    {
                        let repo = SqliteReportRepository::new(&tx);
                        for report in &reports {
                            let outcome = repo.upsert_pulled(&report.to_pulled())?;
                            summary.tally(outcome, |s| &mut s.reports);
                        }
                    }
                    tx.commit()?;
                }

                for report in &reports {
                    match self.remote.fetch_audit(report.id).await {
                        Ok(full) => self.merge_findings(&full, &mut summary)?,
                        Err(error) => {
                            tracing::warn!(
                                report = report.id,
                                class = error.class(),
                                %error,
                                "report fetch failed; continuing with the next report"
                            );
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(class = error.class(), %error, "audit list fetch failed; continuing");
            }
        }

        {
            let conn = self.db.connection();
            SqliteSyncMetaRepository::new(&conn).set_last_pulled_at(unix_timestamp_ms())?;
        }
        self.refresh_status()?;

        tracing::info!(
            locations = summary.locations,
            items = summary.items,
            reports = summary.reports,
            findings = summary.findings,
            skipped_dirty = summary.skipped_dirty,
            "pull complete"
        );
        Ok(summary)
    }

    /// Merge one report's embedded findings in a single transaction.
    ///
    /// The parent report was merged in the same pull, so it resolves by
    /// remote id. Findings referencing an item the store has never seen are
    /// data-shape problems on the server side: logged and skipped.
    fn merge_findings(
        &self,
        full: &crate::api::RemoteAuditReport,
        summary: &mut PullSummary,
    ) -> Result<()> {
        let mut conn = self.db.connection();
        let tx = conn.transaction()?;
        {
            let reports = SqliteReportRepository::new(&tx);
            let findings = SqliteFindingRepository::new(&tx);
            let items = SqliteInventoryRepository::new(&tx);

            let Some(parent) = reports.find_by_server_id(full.id)? else {
                tracing::warn!(report = full.id, "parent report missing; skipping findings");
                return Ok(());
            };

            for finding in full.findings.iter().cloned() {
                if items.find_by_server_id(finding.item_id)?.is_none() {
                    tracing::warn!(
                        report = full.id,
                        item = finding.item_id,
                        "finding references an unknown item; skipping"
                    );
                    continue;
                }
                let outcome = findings.upsert_pulled(&parent.local_id, &finding.into_pulled())?;
                summary.tally(outcome, |s| &mut s.findings);
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::db::{
        Database, FindingRepository, InventoryRepository, LocationRepository, ReportRepository,
        SqliteFindingRepository, SqliteInventoryRepository, SqliteLocationRepository,
        SqliteReportRepository, SqliteSyncMetaRepository, SyncMetaRepository,
    };
    use crate::models::AuditStatus;
    use crate::sync::testutil::FakeRemote;
    use crate::sync::{ConnectivityMonitor, SyncEngine};

    const AUDITOR: i64 = 3;

    fn engine(remote: FakeRemote) -> SyncEngine<FakeRemote> {
        let db = Arc::new(Database::open_in_memory().unwrap());
        SyncEngine::new(db, remote, AUDITOR, Arc::new(ConnectivityMonitor::new()))
    }

    fn seeded_remote() -> FakeRemote {
        let remote = FakeRemote::new();
        remote.add_location(7, "B2");
        remote.add_location(8, "B3");
        remote.add_item(7, 42, "SKU-42", 10);
        remote.add_item(7, 43, "SKU-43", 5);
        remote.add_audit(99, 7, AUDITOR, AuditStatus::Draft);
        remote.add_finding(99, 500, 42, 8, -2);
        remote
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_merges_dependency_chain() {
        let engine = engine(seeded_remote());

        let summary = engine.pull().await.unwrap();
        assert_eq!(summary.locations, 2);
        assert_eq!(summary.items, 2);
        assert_eq!(summary.reports, 1);
        assert_eq!(summary.findings, 1);
        assert_eq!(summary.skipped_dirty, 0);

        let conn = engine.database().connection();
        assert_eq!(SqliteLocationRepository::new(&conn).list().unwrap().len(), 2);
        let report = SqliteReportRepository::new(&conn)
            .find_by_server_id(99)
            .unwrap()
            .unwrap();
        assert!(!report.needs_sync);
        let findings = SqliteFindingRepository::new(&conn)
            .list_by_report(&report.local_id)
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].server_id, Some(500));

        let meta = SqliteSyncMetaRepository::new(&conn);
        assert!(meta.last_pulled_at().unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_is_idempotent() {
        let engine = engine(seeded_remote());

        engine.pull().await.unwrap();
        let before = {
            let conn = engine.database().connection();
            SqliteInventoryRepository::new(&conn)
                .find_by_server_id(42)
                .unwrap()
                .unwrap()
        };

        let second = engine.pull().await.unwrap();
        // Nothing changed remotely: nothing applied, nothing rewritten
        assert_eq!(second.locations, 0);
        assert_eq!(second.items, 0);
        assert_eq!(second.reports, 0);
        assert_eq!(second.findings, 0);

        let conn = engine.database().connection();
        let after = SqliteInventoryRepository::new(&conn)
            .find_by_server_id(42)
            .unwrap()
            .unwrap();
        assert_eq!(before.updated_at, after.updated_at);
        assert_eq!(before.local_id, after.local_id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_preserves_dirty_local_edits() {
        let remote = seeded_remote();
        let engine = engine(remote.clone());
        engine.pull().await.unwrap();

        {
            let conn = engine.database().connection();
            let repo = SqliteInventoryRepository::new(&conn);
            let item = repo.find_by_server_id(42).unwrap().unwrap();
            repo.record_count(&item.local_id, 8, Some("TAG-9"), Some("two missing"))
                .unwrap();
        }

        // Remote changes the same item; the dirty local copy must win
        {
            let mut state = remote.state.lock().unwrap();
            let item = state
                .inventory
                .get_mut(&7)
                .unwrap()
                .iter_mut()
                .find(|i| i.id == 42)
                .unwrap();
            item.system_qty = 99;
            item.remarks = Some("server note".to_string());
        }

        let summary = engine.pull().await.unwrap();
        assert_eq!(summary.skipped_dirty, 1);

        let conn = engine.database().connection();
        let item = SqliteInventoryRepository::new(&conn)
            .find_by_server_id(42)
            .unwrap()
            .unwrap();
        assert_eq!(item.system_qty, 10);
        assert_eq!(item.physical_qty, Some(8));
        assert_eq!(item.remarks.as_deref(), Some("two missing"));
        assert!(item.needs_sync);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_fails_only_when_locations_fail() {
        let remote = seeded_remote();
        remote.state.lock().unwrap().fail_locations = true;
        let engine = engine(remote);

        assert!(engine.pull().await.is_err());

        // Nothing stamped after a terminal failure
        let conn = engine.database().connection();
        assert_eq!(
            SqliteSyncMetaRepository::new(&conn).last_pulled_at().unwrap(),
            None
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_survives_per_location_failures() {
        let remote = seeded_remote();
        remote.state.lock().unwrap().fail_inventory_locations.insert(7);
        let engine = engine(remote);

        let summary = engine.pull().await.unwrap();
        // Location 7's items are gone this cycle, the rest still landed
        assert_eq!(summary.items, 0);
        assert_eq!(summary.locations, 2);
        assert_eq!(summary.reports, 1);

        let conn = engine.database().connection();
        assert!(SqliteSyncMetaRepository::new(&conn)
            .last_pulled_at()
            .unwrap()
            .is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_skips_finding_for_unknown_item() {
        let remote = seeded_remote();
        // Item 777 is never served by the inventory endpoint
        remote.add_finding(99, 501, 777, 3, 0);
        let engine = engine(remote);

        let summary = engine.pull().await.unwrap();
        assert_eq!(summary.findings, 1);

        let conn = engine.database().connection();
        let report = SqliteReportRepository::new(&conn)
            .find_by_server_id(99)
            .unwrap()
            .unwrap();
        let findings = SqliteFindingRepository::new(&conn)
            .list_by_report(&report.local_id)
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].item_server_id, 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_refreshes_pending_badge() {
        let engine = engine(seeded_remote());
        engine.pull().await.unwrap();

        assert_eq!(engine.monitor().pending_count(), 0);
        assert!(engine.monitor().snapshot().last_synced_at.is_some());
    }
}
