//! SQLite case log — the persistence boundary for completed checks.
//!
//! RULE: Only store.rs talks to the database.
//! The pipeline writes through the `CaseRecorder` trait and never
//! executes SQL directly. A recorder failure never affects a check.

use crate::{
    error::{CheckError, CheckResult},
    event::{CaseLogEntry, CheckState},
    report::Report,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};

/// Where the pipeline sends its audit trail.
pub trait CaseRecorder: Send + Sync {
    fn record_transition(&self, check_id: &str, from: CheckState, to: CheckState) -> CheckResult<()>;

    fn record_event(&self, entry: &CaseLogEntry) -> CheckResult<()>;

    fn record_report(&self, report: &Report) -> CheckResult<()>;
}

/// A persisted state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRow {
    pub check_id: String,
    pub from_state: String,
    pub to_state: String,
}

pub struct CaseStore {
    conn: Mutex<Connection>,
}

impl CaseStore {
    /// Open (or create) the case log database at `path`.
    pub fn open(path: &str) -> CheckResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CheckResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> CheckResult<()> {
        self.conn()?
            .execute_batch(include_str!("../../migrations/001_case_log.sql"))?;
        Ok(())
    }

    fn conn(&self) -> CheckResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CheckError::Other(anyhow::anyhow!("case store connection lock poisoned")))
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn events_for_check(&self, check_id: &str) -> CheckResult<Vec<CaseLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, check_id, seq, event_kind, source_id, payload
             FROM event_log WHERE check_id = ?1
             ORDER BY seq ASC, id ASC",
        )?;
        let entries = stmt
            .query_map(params![check_id], |row| {
                Ok(CaseLogEntry {
                    id: Some(row.get(0)?),
                    check_id: row.get(1)?,
                    seq: row.get::<_, i64>(2)? as u64,
                    event_kind: row.get(3)?,
                    source_id: row.get(4)?,
                    payload: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn transitions_for_check(&self, check_id: &str) -> CheckResult<Vec<TransitionRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT check_id, from_state, to_state
             FROM state_transition WHERE check_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![check_id], |row| {
                Ok(TransitionRow {
                    check_id: row.get(0)?,
                    from_state: row.get(1)?,
                    to_state: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn report_for_check(&self, check_id: &str) -> CheckResult<Option<Report>> {
        let payload: Option<String> = self
            .conn()?
            .query_row(
                "SELECT payload FROM case_report WHERE check_id = ?1",
                params![check_id],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(CheckError::from))
            .transpose()
    }

    pub fn report_count(&self) -> CheckResult<i64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM case_report", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl CaseRecorder for CaseStore {
    fn record_transition(&self, check_id: &str, from: CheckState, to: CheckState) -> CheckResult<()> {
        self.conn()?.execute(
            "INSERT INTO state_transition (check_id, from_state, to_state, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![check_id, from.name(), to.name(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn record_event(&self, entry: &CaseLogEntry) -> CheckResult<()> {
        self.conn()?.execute(
            "INSERT INTO event_log (check_id, seq, event_kind, source_id, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.check_id,
                entry.seq as i64,
                entry.event_kind,
                entry.source_id,
                entry.payload,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn record_report(&self, report: &Report) -> CheckResult<()> {
        let check_id = report.check_id.as_deref().ok_or_else(|| {
            CheckError::Validation("cannot persist a report without a check id".into())
        })?;
        let payload = serde_json::to_string(report)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO case_report
             (check_id, subject_name, tier, overall_score, block_transaction,
              requires_approval, payload, generated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                check_id,
                report.subject.primary_name(),
                report.tier.label(),
                report.overall_score,
                report.block_transaction,
                report.requires_approval,
                payload,
                report.generated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
