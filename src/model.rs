//! Core domain types: collision strategies, per-file operations, sessions.
//!
//! Strategy parsing is deliberately lossy: unknown names fall back to Rename
//! at this boundary so that no caller can accidentally request an overwrite
//! by mistyping a strategy name. Nothing downstream re-checks strategy text.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Policy for resolving a destination-name collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Leave the source in place when the target name is taken.
    Skip,
    /// Pick a fresh numbered name next to the requested target.
    Rename,
    /// Treat byte-identical source/target as already moved; otherwise rename.
    ReplaceIfSame,
    /// Overwrite (after backup) only when the source is strictly newer.
    ReplaceIfNewer,
    /// Always back up the existing target, then overwrite.
    BackupAndReplace,
    /// Defer to the user. Non-interactive contexts degrade to Rename.
    AskUser,
}

impl Strategy {
    /// Parse a strategy name. Unknown or unsupported names fall back to
    /// Rename (with a logged warning): a surprising rename is recoverable,
    /// silent data loss is not.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Strategy::Skip,
            "rename" => Strategy::Rename,
            "replace-if-same" | "replace_if_same" => Strategy::ReplaceIfSame,
            "replace-if-newer" | "replace_if_newer" => Strategy::ReplaceIfNewer,
            "backup-and-replace" | "backup_and_replace" | "backup" => Strategy::BackupAndReplace,
            "ask" | "ask-user" | "ask_user" => Strategy::AskUser,
            other => {
                warn!(strategy = other, "Unknown strategy name; falling back to rename");
                Strategy::Rename
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Skip => "skip",
            Strategy::Rename => "rename",
            Strategy::ReplaceIfSame => "replace-if-same",
            Strategy::ReplaceIfNewer => "replace-if-newer",
            Strategy::BackupAndReplace => "backup-and-replace",
            Strategy::AskUser => "ask-user",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Rename
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final state of one relocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Outcome::Success),
            "skipped" => Some(Outcome::Skipped),
            "failed" => Some(Outcome::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the session interacts with a human. The core only ever runs
/// non-interactively; the interactive mode exists so the audit schema can
/// distinguish sessions driven by an outer confirmation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    NonInteractive,
    Interactive,
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InteractionMode::NonInteractive => "non-interactive",
            InteractionMode::Interactive => "interactive",
        })
    }
}

/// One file relocation attempt. Created when the move is requested, mutated
/// only by the executor while it runs, and frozen once the outcome is set.
#[derive(Debug, Clone)]
pub struct MoveOperation {
    /// Where the file was before the move.
    pub source_path: PathBuf,
    /// The requested destination, before any collision handling.
    pub target_path: PathBuf,
    pub strategy: Strategy,
    /// The destination actually used (differs from `target_path` on rename).
    pub resolved_path: Option<PathBuf>,
    /// Set only when an existing target was preserved before overwrite.
    pub backup_path: Option<PathBuf>,
    pub outcome: Outcome,
    /// Present iff `outcome == Failed`.
    pub error: Option<String>,
    /// True when an AskUser strategy degraded to Rename because no user was
    /// available to ask. Surfaced so callers can see the decision was skipped.
    pub ask_degraded: bool,
}

impl MoveOperation {
    pub fn new(source: &Path, target: &Path, strategy: Strategy) -> Self {
        Self {
            source_path: source.to_path_buf(),
            target_path: target.to_path_buf(),
            strategy,
            resolved_path: None,
            backup_path: None,
            outcome: Outcome::Failed,
            error: None,
            ask_degraded: false,
        }
    }
}

/// A named batch of operations executed and audited together; the unit of
/// undo.
#[derive(Debug, Clone)]
pub struct MoveSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub interaction_mode: InteractionMode,
    pub dry_run: bool,
    /// For undo sessions: the id of the session being reversed.
    pub undo_of: Option<String>,
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl MoveSession {
    /// Open a new session with a fresh time-derived id.
    pub fn begin(dry_run: bool, undo_of: Option<String>) -> Self {
        Self {
            session_id: new_session_id(),
            started_at: Utc::now(),
            ended_at: None,
            interaction_mode: InteractionMode::NonInteractive,
            dry_run,
            undo_of,
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        }
    }

    /// Fold one operation outcome into the aggregates.
    pub fn tally(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    /// Close the session; aggregates are final after this.
    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }
}

/// Globally unique, time-derived session id: epoch millis plus pid.
/// Sortable by creation time and collision-free across concurrent processes.
fn new_session_id() -> String {
    let epoch_ms = Utc::now().timestamp_millis();
    format!("{}-{}", epoch_ms, std::process::id())
}
