//! Audit report and finding repositories

#![allow(clippy::cast_sign_loss)] // COUNT(*) is never negative

use crate::db::{parse_text_column, UpsertOutcome};
use crate::error::{Error, Result};
use crate::models::{
    AuditFinding, AuditReport, AuditStatus, FindingId, PulledFinding, PulledReport, ReportId,
};
use crate::util::unix_timestamp_ms;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for audit report storage operations
pub trait ReportRepository {
    /// Create a local draft report (dirty, awaiting its first push)
    fn create_draft(&self, location_server_id: i64, auditor_id: i64) -> Result<AuditReport>;

    /// Get a report by local id
    fn find(&self, id: &ReportId) -> Result<Option<AuditReport>>;

    /// Get a report by its remote id
    fn find_by_server_id(&self, server_id: i64) -> Result<Option<AuditReport>>;

    /// List reports assigned to an auditor, newest first
    fn list_for_auditor(&self, auditor_id: i64) -> Result<Vec<AuditReport>>;

    /// List locally created reports that have never been pushed
    fn list_unpushed_creations(&self) -> Result<Vec<AuditReport>>;

    /// Merge one server-sourced report, skipping records with unsynced edits
    fn upsert_pulled(&self, incoming: &PulledReport) -> Result<UpsertOutcome>;

    /// Promote a local creation after a successful create-push.
    ///
    /// Stores the returned remote id and clears both flags. The remote id is
    /// written exactly once: promoting a report that already has one fails.
    fn mark_created(&self, id: &ReportId, server_id: i64) -> Result<()>;

    /// Number of dirty reports
    fn count_dirty(&self) -> Result<u64>;
}

/// Trait for audit finding storage operations
pub trait FindingRepository {
    /// Get a finding by local id
    fn find(&self, id: &FindingId) -> Result<Option<AuditFinding>>;

    /// List findings belonging to one report
    fn list_by_report(&self, report_local_id: &ReportId) -> Result<Vec<AuditFinding>>;

    /// List every finding with unsynced local edits, oldest first
    fn list_dirty(&self) -> Result<Vec<AuditFinding>>;

    /// Record a local count against a report.
    ///
    /// The remote service keys findings by report + item, so this is a local
    /// create-or-update: an existing row for the pair is rewritten and
    /// re-marked dirty.
    fn record(
        &self,
        report_local_id: &ReportId,
        item_server_id: i64,
        counted_qty: i64,
        difference: i64,
        biometric_tag: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<AuditFinding>;

    /// Merge one server-sourced finding under an already-resolved parent,
    /// skipping records with unsynced edits
    fn upsert_pulled(
        &self,
        report_local_id: &ReportId,
        incoming: &PulledFinding,
    ) -> Result<UpsertOutcome>;

    /// Clear the dirty flag after a successful push, storing the remote id
    /// on first assignment
    fn mark_synced(&self, id: &FindingId, server_id: Option<i64>) -> Result<()>;

    /// Number of dirty findings
    fn count_dirty(&self) -> Result<u64>;
}

/// SQLite implementation of `ReportRepository`
pub struct SqliteReportRepository<'a> {
    conn: &'a Connection,
}

const REPORT_COLUMNS: &str = "local_id, server_id, location_server_id, auditor_id, status, \
                              is_locally_created, needs_sync, created_at, updated_at";

impl<'a> SqliteReportRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a report from a database row
    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditReport> {
        let local_id: String = row.get(0)?;
        let status: String = row.get(4)?;
        Ok(AuditReport {
            local_id: parse_text_column(0, &local_id)?,
            server_id: row.get(1)?,
            location_server_id: row.get(2)?,
            auditor_id: row.get(3)?,
            status: parse_text_column(4, &status)?,
            is_locally_created: row.get::<_, i32>(5)? != 0,
            needs_sync: row.get::<_, i32>(6)? != 0,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl ReportRepository for SqliteReportRepository<'_> {
    fn create_draft(&self, location_server_id: i64, auditor_id: i64) -> Result<AuditReport> {
        let report = AuditReport::new_draft(location_server_id, auditor_id);

        self.conn.execute(
            "INSERT INTO audit_reports
             (local_id, server_id, location_server_id, auditor_id, status,
              is_locally_created, needs_sync, created_at, updated_at)
             VALUES (?, NULL, ?, ?, ?, 1, 1, ?, ?)",
            params![
                report.local_id.as_str(),
                report.location_server_id,
                report.auditor_id,
                report.status.as_str(),
                report.created_at,
                report.updated_at
            ],
        )?;

        Ok(report)
    }

    fn find(&self, id: &ReportId) -> Result<Option<AuditReport>> {
        self.conn
            .query_row(
                &format!("SELECT {REPORT_COLUMNS} FROM audit_reports WHERE local_id = ?"),
                params![id.as_str()],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn find_by_server_id(&self, server_id: i64) -> Result<Option<AuditReport>> {
        self.conn
            .query_row(
                &format!("SELECT {REPORT_COLUMNS} FROM audit_reports WHERE server_id = ?"),
                params![server_id],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_for_auditor(&self, auditor_id: i64) -> Result<Vec<AuditReport>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM audit_reports
             WHERE auditor_id = ? ORDER BY created_at DESC"
        ))?;
        let reports = stmt
            .query_map(params![auditor_id], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reports)
    }

    fn list_unpushed_creations(&self) -> Result<Vec<AuditReport>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM audit_reports
             WHERE is_locally_created = 1 AND server_id IS NULL
             ORDER BY created_at"
        ))?;
        let reports = stmt
            .query_map([], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reports)
    }

    fn upsert_pulled(&self, incoming: &PulledReport) -> Result<UpsertOutcome> {
        if let Some(existing) = self.find_by_server_id(incoming.server_id)? {
            if existing.needs_sync {
                return Ok(UpsertOutcome::SkippedDirty);
            }
            if !incoming.differs_from(&existing) {
                return Ok(UpsertOutcome::Unchanged);
            }
            self.conn.execute(
                "UPDATE audit_reports
                 SET location_server_id = ?, auditor_id = ?, status = ?, updated_at = ?
                 WHERE local_id = ?",
                params![
                    incoming.location_server_id,
                    incoming.auditor_id,
                    incoming.status.as_str(),
                    unix_timestamp_ms(),
                    existing.local_id.as_str()
                ],
            )?;
            return Ok(UpsertOutcome::Updated);
        }

        let now = unix_timestamp_ms();
        self.conn.execute(
            "INSERT INTO audit_reports
             (local_id, server_id, location_server_id, auditor_id, status,
              is_locally_created, needs_sync, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?)",
            params![
                ReportId::new().as_str(),
                incoming.server_id,
                incoming.location_server_id,
                incoming.auditor_id,
                incoming.status.as_str(),
                now,
                now
            ],
        )?;
        Ok(UpsertOutcome::Inserted)
    }

    fn mark_created(&self, id: &ReportId, server_id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE audit_reports
             SET server_id = ?, is_locally_created = 0, needs_sync = 0, updated_at = ?
             WHERE local_id = ? AND server_id IS NULL",
            params![server_id, unix_timestamp_ms(), id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::InvalidInput(format!(
                "report {id} is missing or already has a server id"
            )));
        }

        Ok(())
    }

    fn count_dirty(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM audit_reports WHERE needs_sync = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// SQLite implementation of `FindingRepository`
pub struct SqliteFindingRepository<'a> {
    conn: &'a Connection,
}

const FINDING_COLUMNS: &str = "local_id, server_id, report_local_id, item_server_id, counted_qty, \
                               difference, biometric_tag, remarks, is_locally_created, needs_sync, \
                               created_at, updated_at";

impl<'a> SqliteFindingRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a finding from a database row
    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditFinding> {
        let local_id: String = row.get(0)?;
        let report_local_id: String = row.get(2)?;
        Ok(AuditFinding {
            local_id: parse_text_column(0, &local_id)?,
            server_id: row.get(1)?,
            report_local_id: parse_text_column(2, &report_local_id)?,
            item_server_id: row.get(3)?,
            counted_qty: row.get(4)?,
            difference: row.get(5)?,
            biometric_tag: row.get(6)?,
            remarks: row.get(7)?,
            is_locally_created: row.get::<_, i32>(8)? != 0,
            needs_sync: row.get::<_, i32>(9)? != 0,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn find_by_server_id(&self, server_id: i64) -> Result<Option<AuditFinding>> {
        self.conn
            .query_row(
                &format!("SELECT {FINDING_COLUMNS} FROM audit_findings WHERE server_id = ?"),
                params![server_id],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn find_by_report_item(
        &self,
        report_local_id: &ReportId,
        item_server_id: i64,
    ) -> Result<Option<AuditFinding>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {FINDING_COLUMNS} FROM audit_findings
                     WHERE report_local_id = ? AND item_server_id = ?"
                ),
                params![report_local_id.as_str(), item_server_id],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }
}

impl FindingRepository for SqliteFindingRepository<'_> {
    fn find(&self, id: &FindingId) -> Result<Option<AuditFinding>> {
        self.conn
            .query_row(
                &format!("SELECT {FINDING_COLUMNS} FROM audit_findings WHERE local_id = ?"),
                params![id.as_str()],
                Self::parse_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_by_report(&self, report_local_id: &ReportId) -> Result<Vec<AuditFinding>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FINDING_COLUMNS} FROM audit_findings
             WHERE report_local_id = ? ORDER BY created_at"
        ))?;
        let findings = stmt
            .query_map(params![report_local_id.as_str()], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(findings)
    }

    fn list_dirty(&self) -> Result<Vec<AuditFinding>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FINDING_COLUMNS} FROM audit_findings
             WHERE needs_sync = 1 ORDER BY updated_at"
        ))?;
        let findings = stmt
            .query_map([], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(findings)
    }

    fn record(
        &self,
        report_local_id: &ReportId,
        item_server_id: i64,
        counted_qty: i64,
        difference: i64,
        biometric_tag: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<AuditFinding> {
        if let Some(existing) = self.find_by_report_item(report_local_id, item_server_id)? {
            self.conn.execute(
                "UPDATE audit_findings
                 SET counted_qty = ?, difference = ?, biometric_tag = ?, remarks = ?,
                     needs_sync = 1, updated_at = ?
                 WHERE local_id = ?",
                params![
                    counted_qty,
                    difference,
                    biometric_tag,
                    remarks,
                    unix_timestamp_ms(),
                    existing.local_id.as_str()
                ],
            )?;
            return self
                .find(&existing.local_id)?
                .ok_or_else(|| Error::NotFound(existing.local_id.to_string()));
        }

        let finding = AuditFinding::new(
            *report_local_id,
            item_server_id,
            counted_qty,
            difference,
            biometric_tag.map(str::to_string),
            remarks.map(str::to_string),
        );
        self.conn.execute(
            "INSERT INTO audit_findings
             (local_id, server_id, report_local_id, item_server_id, counted_qty, difference,
              biometric_tag, remarks, is_locally_created, needs_sync, created_at, updated_at)
             VALUES (?, NULL, ?, ?, ?, ?, ?, ?, 1, 1, ?, ?)",
            params![
                finding.local_id.as_str(),
                finding.report_local_id.as_str(),
                finding.item_server_id,
                finding.counted_qty,
                finding.difference,
                finding.biometric_tag,
                finding.remarks,
                finding.created_at,
                finding.updated_at
            ],
        )?;
        Ok(finding)
    }

    fn upsert_pulled(
        &self,
        report_local_id: &ReportId,
        incoming: &PulledFinding,
    ) -> Result<UpsertOutcome> {
        // Match by remote id first, then by the report+item pair so a
        // just-pushed local row is recognized instead of duplicated.
        let existing = match self.find_by_server_id(incoming.server_id)? {
            Some(found) => Some(found),
            None => self.find_by_report_item(report_local_id, incoming.item_server_id)?,
        };

        if let Some(existing) = existing {
            if existing.needs_sync {
                return Ok(UpsertOutcome::SkippedDirty);
            }
            if existing.server_id == Some(incoming.server_id) && !incoming.differs_from(&existing)
            {
                return Ok(UpsertOutcome::Unchanged);
            }
            self.conn.execute(
                "UPDATE audit_findings
                 SET server_id = COALESCE(server_id, ?), counted_qty = ?, difference = ?,
                     biometric_tag = ?, remarks = ?, updated_at = ?
                 WHERE local_id = ?",
                params![
                    incoming.server_id,
                    incoming.counted_qty,
                    incoming.difference,
                    incoming.biometric_tag,
                    incoming.remarks,
                    unix_timestamp_ms(),
                    existing.local_id.as_str()
                ],
            )?;
            return Ok(UpsertOutcome::Updated);
        }

        let now = unix_timestamp_ms();
        self.conn.execute(
            "INSERT INTO audit_findings
             (local_id, server_id, report_local_id, item_server_id, counted_qty, difference,
              biometric_tag, remarks, is_locally_created, needs_sync, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)",
            params![
                FindingId::new().as_str(),
                incoming.server_id,
                report_local_id.as_str(),
                incoming.item_server_id,
                incoming.counted_qty,
                incoming.difference,
                incoming.biometric_tag,
                incoming.remarks,
                now,
                now
            ],
        )?;
        Ok(UpsertOutcome::Inserted)
    }

    fn mark_synced(&self, id: &FindingId, server_id: Option<i64>) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE audit_findings
             SET server_id = COALESCE(server_id, ?), is_locally_created = 0, needs_sync = 0
             WHERE local_id = ?",
            params![server_id, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn count_dirty(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM audit_findings WHERE needs_sync = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_draft_then_promote() {
        let db = setup();
        let conn = db.connection();
        let repo = SqliteReportRepository::new(&conn);

        let draft = repo.create_draft(7, 3).unwrap();
        assert_eq!(repo.list_unpushed_creations().unwrap().len(), 1);
        assert_eq!(repo.count_dirty().unwrap(), 1);

        repo.mark_created(&draft.local_id, 99).unwrap();
        let promoted = repo.find(&draft.local_id).unwrap().unwrap();
        assert_eq!(promoted.server_id, Some(99));
        assert!(!promoted.needs_sync);
        assert!(!promoted.is_locally_created);
        assert!(repo.list_unpushed_creations().unwrap().is_empty());

        // The remote id is written exactly once
        assert!(repo.mark_created(&draft.local_id, 100).is_err());
        let unchanged = repo.find(&draft.local_id).unwrap().unwrap();
        assert_eq!(unchanged.server_id, Some(99));
    }

    #[test]
    fn test_report_upsert_skips_dirty() {
        let db = setup();
        let conn = db.connection();
        let repo = SqliteReportRepository::new(&conn);

        let draft = repo.create_draft(7, 3).unwrap();
        repo.mark_created(&draft.local_id, 99).unwrap();

        // Re-dirty by hand to simulate local divergence
        conn.execute(
            "UPDATE audit_reports SET needs_sync = 1 WHERE local_id = ?",
            params![draft.local_id.as_str()],
        )
        .unwrap();

        let outcome = repo
            .upsert_pulled(&PulledReport {
                server_id: 99,
                location_server_id: 7,
                auditor_id: 3,
                status: AuditStatus::Approved,
            })
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::SkippedDirty);

        let stored = repo.find(&draft.local_id).unwrap().unwrap();
        assert_eq!(stored.status, AuditStatus::Draft);
    }

    #[test]
    fn test_mangled_row_surfaces_as_corruption() {
        let db = setup();
        let conn = db.connection();
        let repo = SqliteReportRepository::new(&conn);

        let draft = repo.create_draft(7, 3).unwrap();
        conn.execute(
            "UPDATE audit_reports SET status = 'banana' WHERE local_id = ?",
            params![draft.local_id.as_str()],
        )
        .unwrap();
        assert!(repo.find(&draft.local_id).unwrap_err().is_corruption());

        conn.execute("UPDATE audit_reports SET local_id = 'not-a-uuid'", [])
            .unwrap();
        assert!(repo.list_for_auditor(3).unwrap_err().is_corruption());
    }

    #[test]
    fn test_report_pull_applies_remote_status() {
        let db = setup();
        let conn = db.connection();
        let repo = SqliteReportRepository::new(&conn);

        repo.upsert_pulled(&PulledReport {
            server_id: 99,
            location_server_id: 7,
            auditor_id: 3,
            status: AuditStatus::Submitted,
        })
        .unwrap();

        let outcome = repo
            .upsert_pulled(&PulledReport {
                server_id: 99,
                location_server_id: 7,
                auditor_id: 3,
                status: AuditStatus::Approved,
            })
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let stored = repo.find_by_server_id(99).unwrap().unwrap();
        assert_eq!(stored.status, AuditStatus::Approved);
    }

    #[test]
    fn test_finding_record_is_create_or_update() {
        let db = setup();
        let conn = db.connection();
        let reports = SqliteReportRepository::new(&conn);
        let findings = SqliteFindingRepository::new(&conn);

        let draft = reports.create_draft(7, 3).unwrap();

        let first = findings
            .record(&draft.local_id, 42, 8, -2, None, None)
            .unwrap();
        let second = findings
            .record(&draft.local_id, 42, 9, -1, Some("TAG"), None)
            .unwrap();

        // Same local row, rewritten
        assert_eq!(first.local_id, second.local_id);
        assert_eq!(second.counted_qty, 9);
        assert_eq!(findings.list_by_report(&draft.local_id).unwrap().len(), 1);
        assert_eq!(findings.count_dirty().unwrap(), 1);
    }

    #[test]
    fn test_finding_mark_synced_assigns_server_id_once() {
        let db = setup();
        let conn = db.connection();
        let reports = SqliteReportRepository::new(&conn);
        let findings = SqliteFindingRepository::new(&conn);

        let draft = reports.create_draft(7, 3).unwrap();
        let finding = findings
            .record(&draft.local_id, 42, 8, -2, None, None)
            .unwrap();

        findings.mark_synced(&finding.local_id, Some(500)).unwrap();
        let synced = findings.find(&finding.local_id).unwrap().unwrap();
        assert_eq!(synced.server_id, Some(500));
        assert!(!synced.needs_sync);

        // A later sync must not overwrite the first assignment
        findings.mark_synced(&finding.local_id, Some(501)).unwrap();
        let stored = findings.find(&finding.local_id).unwrap().unwrap();
        assert_eq!(stored.server_id, Some(500));
    }

    #[test]
    fn test_finding_pull_matches_pushed_row_by_pair() {
        let db = setup();
        let conn = db.connection();
        let reports = SqliteReportRepository::new(&conn);
        let findings = SqliteFindingRepository::new(&conn);

        let draft = reports.create_draft(7, 3).unwrap();
        let finding = findings
            .record(&draft.local_id, 42, 8, -2, None, None)
            .unwrap();
        // Pushed, but the remote did not echo an id
        findings.mark_synced(&finding.local_id, None).unwrap();

        let outcome = findings
            .upsert_pulled(
                &draft.local_id,
                &PulledFinding {
                    server_id: 500,
                    report_server_id: 99,
                    item_server_id: 42,
                    counted_qty: 8,
                    difference: -2,
                    biometric_tag: None,
                    remarks: None,
                },
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        // No duplicate row; remote id backfilled
        let all = findings.list_by_report(&draft.local_id).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].server_id, Some(500));
    }

    #[test]
    fn test_finding_pull_skips_dirty() {
        let db = setup();
        let conn = db.connection();
        let reports = SqliteReportRepository::new(&conn);
        let findings = SqliteFindingRepository::new(&conn);

        let draft = reports.create_draft(7, 3).unwrap();
        findings
            .record(&draft.local_id, 42, 8, -2, None, Some("local note"))
            .unwrap();

        let outcome = findings
            .upsert_pulled(
                &draft.local_id,
                &PulledFinding {
                    server_id: 500,
                    report_server_id: 99,
                    item_server_id: 42,
                    counted_qty: 100,
                    difference: 90,
                    biometric_tag: None,
                    remarks: None,
                },
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::SkippedDirty);

        let all = findings.list_by_report(&draft.local_id).unwrap();
        assert_eq!(all[0].counted_qty, 8);
        assert_eq!(all[0].remarks.as_deref(), Some("local note"));
    }
}
