//! Move execution: one source -> destination relocation.
//!
//! Attempts an atomic rename; on cross-filesystem or other rename errors it
//! falls back to durable copy+remove. After the move both post-conditions
//! are re-checked (destination present, source gone) — the return code of
//! the rename call alone is not trusted.
//!
//! Nothing here propagates a per-file failure: every error is folded into
//! the returned MoveOperation so the batch can continue.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

use super::allocate::allocate;
use super::atomic::try_atomic_move;
use super::backup::BackupStore;
use super::copy::safe_copy_and_rename;
use super::helpers::io_error_with_help;
use super::resolve::{Resolution, resolve_collision};
use crate::errors::RelocError;
use crate::model::{MoveOperation, Outcome, Strategy};

/// Execute (or, for dry runs, simulate) a single relocation.
pub fn execute(
    backups: &BackupStore,
    source: &Path,
    target: &Path,
    strategy: Strategy,
    dry_run: bool,
    session_id: &str,
) -> MoveOperation {
    let mut op = MoveOperation::new(source, target, strategy);
    match try_execute(backups, &mut op, dry_run, session_id) {
        Ok(()) => op,
        Err(e) => {
            op.outcome = Outcome::Failed;
            op.error = Some(format!("{e:#}"));
            op
        }
    }
}

fn try_execute(
    backups: &BackupStore,
    op: &mut MoveOperation,
    dry_run: bool,
    session_id: &str,
) -> Result<()> {
    let source = op.source_path.clone();
    let target = op.target_path.clone();

    if !source.exists() {
        return Err(RelocError::SourceNotFound(source).into());
    }

    let decision = resolve_collision(&source, &target, op.strategy);
    op.ask_degraded = decision.ask_degraded;

    if dry_run {
        return simulate(op, decision.resolution);
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| classify_mkdir_error(parent, e))?;
    }

    match decision.resolution {
        Resolution::SkipExisting => {
            info!(source = %source.display(), target = %target.display(), "Target exists; skipping");
            op.outcome = Outcome::Skipped;
            Ok(())
        }

        Resolution::SourceRedundant => {
            // Content already lives at the target; removing the source is the
            // one deletion with no separate surviving copy, sanctioned because
            // the bytes are provably identical.
            fs::remove_file(&source).map_err(io_error_with_help("remove redundant source", &source))?;
            info!(source = %source.display(), target = %target.display(), "Identical content; removed source");
            op.resolved_path = Some(target);
            op.outcome = Outcome::Success;
            Ok(())
        }

        Resolution::UseTarget => {
            relocate_file(&source, &target)?;
            op.resolved_path = Some(target);
            op.outcome = Outcome::Success;
            Ok(())
        }

        Resolution::Renamed(dest) => {
            // The allocation was a pure probe; re-check right before use.
            let dest = if dest.exists() { allocate(&dest) } else { dest };
            relocate_file(&source, &dest)?;
            op.resolved_path = Some(dest);
            op.outcome = Outcome::Success;
            Ok(())
        }

        Resolution::ReplaceAfterBackup => {
            op.backup_path = Some(backups.preserve(&target, session_id)?);
            relocate_file(&source, &target)?;
            op.resolved_path = Some(target);
            op.outcome = Outcome::Success;
            Ok(())
        }
    }
}

/// Dry-run: record the decision without touching the filesystem.
fn simulate(op: &mut MoveOperation, resolution: Resolution) -> Result<()> {
    match resolution {
        Resolution::SkipExisting => {
            info!(source = %op.source_path.display(), "dry-run: would skip (target exists)");
            op.outcome = Outcome::Skipped;
        }
        Resolution::SourceRedundant => {
            info!(source = %op.source_path.display(), "dry-run: identical content, would remove source");
            op.resolved_path = Some(op.target_path.clone());
            op.outcome = Outcome::Success;
        }
        Resolution::UseTarget | Resolution::ReplaceAfterBackup => {
            info!(
                source = %op.source_path.display(),
                dest = %op.target_path.display(),
                "dry-run: would move"
            );
            op.resolved_path = Some(op.target_path.clone());
            op.outcome = Outcome::Success;
        }
        Resolution::Renamed(dest) => {
            info!(
                source = %op.source_path.display(),
                dest = %dest.display(),
                "dry-run: would move under a new name"
            );
            op.resolved_path = Some(dest);
            op.outcome = Outcome::Success;
        }
    }
    Ok(())
}

/// Move a file and verify the post-conditions. Shared by forward moves and
/// undo restores.
pub(crate) fn relocate_file(source: &Path, dest: &Path) -> Result<()> {
    match try_atomic_move(source, dest) {
        Ok(()) => {
            info!(src = %source.display(), dest = %dest.display(), "Renamed file atomically");
        }
        Err(e) => {
            warn!(error = %e, "Atomic rename failed, using safe copy+remove");
            safe_copy_and_rename(source, dest)?;
            fs::remove_file(source).map_err(io_error_with_help("remove original file", source))?;
        }
    }

    // Verify both post-conditions; a clean return code is not proof.
    if !dest.exists() {
        return Err(RelocError::Verification {
            src: source.to_path_buf(),
            dest: dest.to_path_buf(),
            detail: "destination missing after move reported success".into(),
        }
        .into());
    }
    if source.exists() {
        return Err(RelocError::Verification {
            src: source.to_path_buf(),
            dest: dest.to_path_buf(),
            detail: "source still present after move reported success".into(),
        }
        .into());
    }
    Ok(())
}

fn classify_mkdir_error(parent: &Path, e: io::Error) -> anyhow::Error {
    if e.kind() == io::ErrorKind::PermissionDenied {
        RelocError::PermissionDenied {
            path: parent.to_path_buf(),
            detail: e.to_string(),
        }
        .into()
    } else {
        RelocError::DestinationUnavailable {
            path: parent.to_path_buf(),
            detail: e.to_string(),
        }
        .into()
    }
}
