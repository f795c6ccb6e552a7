//! Batch orchestration: runs a list of moves sequentially, persists every
//! outcome, and reverses previously recorded sessions.
//!
//! Moves are strictly sequential: each file's mutation plus its audit write
//! completes before the next begins. Concurrent moves sharing a destination
//! directory would race on the allocator's existence probe, so sequential
//! execution is the correctness boundary here (the area lock in fs_ops::lock
//! extends it across processes).
//!
//! Per-file failures never cross this boundary; only audit-store write
//! failures abort a batch, since losing the trail defeats the system's
//! purpose.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::audit::{AuditLog, AuditRecord, OpKind};
use crate::errors::RelocError;
use crate::fs_ops::backup::BackupStore;
use crate::fs_ops::executor::{self, relocate_file};
use crate::model::{MoveOperation, MoveSession, Outcome, Strategy};
use crate::shutdown;

pub struct BatchCoordinator<'a> {
    backups: BackupStore,
    /// Absent only for dry runs, which must leave the store untouched.
    audit: Option<&'a AuditLog>,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(backup_root: impl Into<PathBuf>, audit: Option<&'a AuditLog>) -> Self {
        Self {
            backups: BackupStore::new(backup_root),
            audit,
        }
    }

    /// Run a batch of (source, target) pairs under one strategy.
    /// Returns the finalized session plus the per-file operations, in input
    /// order (truncated if the batch was interrupted).
    pub fn run_batch(
        &self,
        pairs: &[(PathBuf, PathBuf)],
        strategy: Strategy,
        dry_run: bool,
    ) -> Result<(MoveSession, Vec<MoveOperation>)> {
        let audit = match (dry_run, self.audit) {
            (true, _) => None,
            (false, Some(a)) => Some(a),
            (false, None) => bail!("live batch requires an audit store"),
        };

        let mut session = MoveSession::begin(dry_run, None);
        if let Some(a) = audit {
            a.begin_session(&session)
                .context("open audit session")?;
        }
        info!(
            session = %session.session_id,
            files = pairs.len(),
            strategy = %strategy,
            dry_run,
            "batch started"
        );

        let mut ops = Vec::with_capacity(pairs.len());
        for (source, target) in pairs {
            // Cancellation is honored only at file boundaries; a move is
            // never abandoned between "source detached" and "audit written".
            if shutdown::is_requested() {
                warn!(session = %session.session_id, "interrupt requested; stopping batch early");
                break;
            }

            let op = executor::execute(
                &self.backups,
                source,
                target,
                strategy,
                dry_run,
                &session.session_id,
            );
            session.tally(op.outcome);
            if let Some(a) = audit {
                a.record_operation(&session.session_id, &op, OpKind::Move)
                    .context("record operation in audit store")?;
            }
            ops.push(op);
        }

        session.finish();
        if let Some(a) = audit {
            a.finish_session(&session)
                .context("finalize audit session")?;
        }
        info!(
            session = %session.session_id,
            succeeded = session.succeeded,
            failed = session.failed,
            skipped = session.skipped,
            "batch finished"
        );
        Ok((session, ops))
    }

    /// Reverse a recorded session: move each successful operation's file
    /// from its resolved path back to its original source, newest first.
    /// Best-effort — individual failures are counted, not fatal — and every
    /// restore attempt is itself recorded under a new undo session.
    pub fn undo_session(
        &self,
        session_id: &str,
    ) -> Result<(MoveSession, Vec<MoveOperation>)> {
        let audit = self
            .audit
            .ok_or_else(|| anyhow::anyhow!("undo requires an audit store"))?;

        let records = audit.list_operations_for_session(session_id)?;
        if records.is_empty() {
            bail!("no undoable operations recorded for session {session_id}");
        }

        let mut session = MoveSession::begin(false, Some(session_id.to_string()));
        audit
            .begin_session(&session)
            .context("open undo session")?;
        info!(
            session = %session.session_id,
            undo_of = session_id,
            files = records.len(),
            "undo started"
        );

        let mut ops = Vec::with_capacity(records.len());
        for record in &records {
            if shutdown::is_requested() {
                warn!(session = %session.session_id, "interrupt requested; stopping undo early");
                break;
            }

            let op = undo_one(record);
            session.tally(op.outcome);
            audit
                .record_operation(&session.session_id, &op, OpKind::Undo)
                .context("record undo operation in audit store")?;
            ops.push(op);
        }

        session.finish();
        audit
            .finish_session(&session)
            .context("finalize undo session")?;
        info!(
            session = %session.session_id,
            restored = session.succeeded,
            failed = session.failed,
            "undo finished"
        );
        Ok((session, ops))
    }
}

/// Restore one recorded operation. The operation's source/target are the
/// restore's from/to: the file moves from where it ended up back to where it
/// came from.
fn undo_one(record: &AuditRecord) -> MoveOperation {
    let from = record
        .resolved_path
        .clone()
        .unwrap_or_else(|| record.target_path.clone());
    let mut op = MoveOperation::new(&from, &record.source_path, record.strategy);
    match try_undo(&from, record) {
        Ok(restored) => {
            op.resolved_path = Some(restored);
            op.outcome = Outcome::Success;
        }
        Err(e) => {
            warn!(
                file = %from.display(),
                original = %record.source_path.display(),
                error = %format!("{e:#}"),
                "undo failed for one file"
            );
            op.outcome = Outcome::Failed;
            op.error = Some(format!("{e:#}"));
        }
    }
    op
}

fn try_undo(from: &Path, record: &AuditRecord) -> Result<PathBuf> {
    if !from.exists() {
        return Err(RelocError::SourceNotFound(from.to_path_buf()).into());
    }
    let original = &record.source_path;
    // The original slot being occupied is a conflict, not a license to
    // rename: the operator must reconcile by hand.
    if original.exists() {
        return Err(RelocError::UndoCollision(original.clone()).into());
    }
    if let Some(parent) = original.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("create original parent directory '{}'", parent.display())
        })?;
    }
    relocate_file(from, original)?;
    Ok(original.clone())
}
