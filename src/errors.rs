//! Typed error definitions for reloc.
//! Provides a small set of well-known failure modes for better logs and tests.
//!
//! Per-file failures (path problems, verification mismatches, undo
//! collisions) are captured into the owning MoveOperation and never abort a
//! batch; only audit-store and lock errors are fatal.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelocError {
    #[error("Source path not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Cannot prepare destination directory {path}: {detail}")]
    DestinationUnavailable { path: PathBuf, detail: String },

    #[error("Permission denied on {path}: {detail}")]
    PermissionDenied { path: PathBuf, detail: String },

    #[error("Post-move verification failed for '{src}' -> '{dest}': {detail}")]
    Verification {
        src: PathBuf,
        dest: PathBuf,
        detail: String,
    },

    #[error("Original location already occupied: {0}")]
    UndoCollision(PathBuf),

    #[error("Audit store error: {0}")]
    Audit(#[from] rusqlite::Error),

    #[error("Another reloc process is active (lock at {0})")]
    LockHeld(PathBuf),

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl RelocError {
    /// Stable machine-readable code for structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            RelocError::SourceNotFound(_) => "source_not_found",
            RelocError::DestinationUnavailable { .. } => "dest_unavailable",
            RelocError::PermissionDenied { .. } => "permission_denied",
            RelocError::Verification { .. } => "verification_failed",
            RelocError::UndoCollision(_) => "undo_collision",
            RelocError::Audit(_) => "audit_store",
            RelocError::LockHeld(_) => "lock_held",
            RelocError::Interrupted => "interrupted",
        }
    }
}
