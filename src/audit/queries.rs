//! Query surface of the audit store.
//!
//! Sessions are inserted when a batch opens and finalized when it closes, so
//! operation rows always reference an existing session and an interrupted
//! run is visible as a session without `ended_at`. Operation inserts are
//! append-only; there is no update or delete path on purpose.

use chrono::{Duration, Utc};
use rusqlite::{Result, Row, params};
use std::path::PathBuf;
use tracing::debug;

use super::models::{AuditRecord, OpKind, SessionRecord};
use super::store::AuditLog;
use crate::model::{MoveOperation, MoveSession, Outcome, Strategy};

/// Bound on interactive history listings.
const HISTORY_PAGE_SIZE: i64 = 100;

impl AuditLog {
    /// Insert the session row before its first operation is recorded.
    pub fn begin_session(&self, session: &MoveSession) -> Result<()> {
        self.connection().execute(
            "INSERT INTO move_session (session_id, started_at, interaction_mode, dry_run, undo_of) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.session_id,
                session.started_at.to_rfc3339(),
                session.interaction_mode.to_string(),
                session.dry_run as i64,
                session.undo_of,
            ],
        )?;
        debug!(session = %session.session_id, "session opened");
        Ok(())
    }

    /// Finalize the aggregate counts once the batch completes.
    pub fn finish_session(&self, session: &MoveSession) -> Result<()> {
        let ended = session
            .ended_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        self.connection().execute(
            "UPDATE move_session SET ended_at = ?1, total = ?2, succeeded = ?3, \
             failed = ?4, skipped = ?5 WHERE session_id = ?6",
            params![
                ended,
                session.total as i64,
                session.succeeded as i64,
                session.failed as i64,
                session.skipped as i64,
                session.session_id,
            ],
        )?;
        debug!(session = %session.session_id, "session finalized");
        Ok(())
    }

    /// Append one operation row. Each call is its own write transaction.
    pub fn record_operation(
        &self,
        session_id: &str,
        op: &MoveOperation,
        kind: OpKind,
    ) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO move_operation (session_id, kind, source_path, target_path, strategy, \
             resolved_path, backup_path, outcome, error, ask_degraded, recorded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                session_id,
                kind.as_str(),
                op.source_path.to_string_lossy().into_owned(),
                op.target_path.to_string_lossy().into_owned(),
                op.strategy.as_str(),
                op.resolved_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                op.backup_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                op.outcome.as_str(),
                op.error,
                op.ask_degraded as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    /// Operations recorded within the last `days`, newest first, bounded to
    /// one page so interactive history stays responsive.
    pub fn list_operations(&self, days: u32) -> Result<Vec<AuditRecord>> {
        let cutoff = (Utc::now() - Duration::days(days as i64)).to_rfc3339();
        let mut stmt = self.connection().prepare(
            "SELECT id, session_id, kind, source_path, target_path, strategy, resolved_path, \
                    backup_path, outcome, error, ask_degraded, recorded_at \
             FROM move_operation WHERE recorded_at >= ?1 \
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![cutoff, HISTORY_PAGE_SIZE], record_from_row)?;
        rows.collect()
    }

    /// Successful operations of one session, newest first. Only successes
    /// are undoable; skips moved nothing and failures left the source alone.
    pub fn list_operations_for_session(&self, session_id: &str) -> Result<Vec<AuditRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, session_id, kind, source_path, target_path, strategy, resolved_path, \
                    backup_path, outcome, error, ask_degraded, recorded_at \
             FROM move_operation WHERE session_id = ?1 AND outcome = 'success' \
             ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![session_id], record_from_row)?;
        rows.collect()
    }

    /// Fetch one session aggregate row.
    pub fn session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT session_id, started_at, ended_at, interaction_mode, dry_run, undo_of, \
                    total, succeeded, failed, skipped \
             FROM move_session WHERE session_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![session_id], |row| {
            Ok(SessionRecord {
                session_id: row.get(0)?,
                started_at: row.get(1)?,
                ended_at: row.get(2)?,
                interaction_mode: row.get(3)?,
                dry_run: row.get::<_, i64>(4)? != 0,
                undo_of: row.get(5)?,
                total: row.get(6)?,
                succeeded: row.get(7)?,
                failed: row.get(8)?,
                skipped: row.get(9)?,
            })
        })?;
        rows.next().transpose()
    }
}

fn record_from_row(row: &Row<'_>) -> Result<AuditRecord> {
    let kind: String = row.get(2)?;
    let strategy: String = row.get(5)?;
    let outcome: String = row.get(8)?;
    Ok(AuditRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        kind: OpKind::parse(&kind).unwrap_or(OpKind::Move),
        source_path: PathBuf::from(row.get::<_, String>(3)?),
        target_path: PathBuf::from(row.get::<_, String>(4)?),
        strategy: Strategy::parse_lossy(&strategy),
        resolved_path: row.get::<_, Option<String>>(6)?.map(PathBuf::from),
        backup_path: row.get::<_, Option<String>>(7)?.map(PathBuf::from),
        outcome: Outcome::parse(&outcome).unwrap_or(Outcome::Failed),
        error: row.get(9)?,
        ask_degraded: row.get::<_, i64>(10)? != 0,
        recorded_at: row.get(11)?,
    })
}
