//! Push protocol: local changes back to the server
//!
//! Three passes in dependency order: report creations first (they mint the
//! remote ids findings need), then dirty findings, then dirty inventory
//! items. A failed record stays dirty and is retried next cycle; a finding
//! whose parent report still has no remote id is deferred without an
//! attempt. Per-record failures never abort the pass.

use crate::api::{FindingPayload, ItemAuditPatch, RemoteService};
use crate::db::{
    FindingRepository, InventoryRepository, ReportRepository, SqliteFindingRepository,
    SqliteInventoryRepository, SqliteReportRepository, SqliteSyncMetaRepository,
    SyncMetaRepository,
};
use crate::error::Result;
use crate::util::unix_timestamp_ms;

use super::SyncEngine;

impl<R: RemoteService> SyncEngine<R> {
    /// Run one push. Returns the number of records synced.
    ///
    /// The push watermark is stamped only when at least one record synced.
    pub async fn push(&self) -> Result<usize> {
        let mut synced = 0usize;

        synced += self.push_report_creations().await?;
        synced += self.push_findings().await?;
        synced += self.push_items().await?;

        if synced > 0 {
            let conn = self.db.connection();
            SqliteSyncMetaRepository::new(&conn).set_last_pushed_at(unix_timestamp_ms())?;
        }
        self.refresh_status()?;

        tracing::info!(synced, "push complete");
        Ok(synced)
    }

    async fn push_report_creations(&self) -> Result<usize> {
        let pending = {
            let conn = self.db.connection();
            SqliteReportRepository::new(&conn).list_unpushed_creations()?
        };

        let mut synced = 0;
        for report in pending {
            match self.remote.create_audit(report.location_server_id).await {
                Ok(created) => {
                    let conn = self.db.connection();
                    SqliteReportRepository::new(&conn)
                        .mark_created(&report.local_id, created.id)?;
                    synced += 1;
                    tracing::debug!(
                        report = %report.local_id,
                        server_id = created.id,
                        "report creation pushed"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        report = %report.local_id,
                        class = error.class(),
                        %error,
                        "report create failed; record stays pending"
                    );
                }
            }
        }
        Ok(synced)
    }

    async fn push_findings(&self) -> Result<usize> {
        let dirty = {
            let conn = self.db.connection();
            SqliteFindingRepository::new(&conn).list_dirty()?
        };

        let mut synced = 0;
        for finding in dirty {
            let parent_server_id = {
                let conn = self.db.connection();
                SqliteReportRepository::new(&conn)
                    .find(&finding.report_local_id)?
                    .and_then(|report| report.server_id)
            };
            let Some(report_server_id) = parent_server_id else {
                // Parent creation has not been acknowledged; retry next cycle
                tracing::debug!(finding = %finding.local_id, "parent report unsynced; deferring");
                continue;
            };

            let payload = FindingPayload {
                item_id: finding.item_server_id,
                counted_qty: finding.counted_qty,
                difference: finding.difference,
                biometric_tag: finding.biometric_tag.clone(),
                remarks: finding.remarks.clone(),
            };
            match self.remote.push_finding(report_server_id, &payload).await {
                Ok(remote) => {
                    let conn = self.db.connection();
                    SqliteFindingRepository::new(&conn)
                        .mark_synced(&finding.local_id, Some(remote.id))?;
                    synced += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        finding = %finding.local_id,
                        class = error.class(),
                        %error,
                        "finding push failed; record stays pending"
                    );
                }
            }
        }
        Ok(synced)
    }

    async fn push_items(&self) -> Result<usize> {
        let dirty = {
            let conn = self.db.connection();
            SqliteInventoryRepository::new(&conn).list_dirty()?
        };

        let mut synced = 0;
        for item in dirty {
            let Some(item_server_id) = item.server_id else {
                // Items are never created locally, so this should not happen
                tracing::warn!(item = %item.local_id, "dirty item without server id; skipping");
                continue;
            };

            let patch = ItemAuditPatch {
                physical_qty: item.physical_qty,
                difference: item.difference(),
                biometric_tag: item.biometric_tag.clone(),
                remarks: item.remarks.clone(),
            };
            match self.remote.update_item(item_server_id, &patch).await {
                Ok(()) => {
                    let conn = self.db.connection();
                    SqliteInventoryRepository::new(&conn).mark_synced(&item.local_id)?;
                    synced += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        item = %item.local_id,
                        class = error.class(),
                        %error,
                        "item push failed; record stays pending"
                    );
                }
            }
        }
        Ok(synced)
    }
}
