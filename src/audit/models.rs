//! Persisted row shapes read back out of the audit store.

use std::path::PathBuf;

use crate::model::{Outcome, Strategy};

/// Whether a recorded operation was a forward move or an undo restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Move,
    Undo,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Move => "move",
            OpKind::Undo => "undo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "move" => Some(OpKind::Move),
            "undo" => Some(OpKind::Undo),
            _ => None,
        }
    }
}

/// One persisted MoveOperation.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: i64,
    pub session_id: String,
    pub kind: OpKind,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub strategy: Strategy,
    pub resolved_path: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,
    pub outcome: Outcome,
    pub error: Option<String>,
    pub ask_degraded: bool,
    pub recorded_at: String,
}

/// One persisted MoveSession aggregate row.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub interaction_mode: String,
    pub dry_run: bool,
    pub undo_of: Option<String>,
    pub total: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub skipped: i64,
}
