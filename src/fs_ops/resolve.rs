//! Collision resolution: strategy -> decision.
//!
//! Invoked only when the requested target exists. Decisions are computed
//! from filesystem state (existence, size, digest, mtime) without mutating
//! anything; the executor carries them out, so a dry run can preview the
//! decision by calling this and then doing nothing.

use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::allocate::allocate;
use super::checksum;
use crate::model::Strategy;

/// What to do about an occupied target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Target is free; move straight to it.
    UseTarget,
    /// Move to a freshly allocated name instead.
    Renamed(PathBuf),
    /// Overwrite the target, preserving it in the backup store first.
    ReplaceAfterBackup,
    /// Leave the source alone; the operation is a skip.
    SkipExisting,
    /// Source and target are byte-identical: drop the source, the content
    /// is already at its destination.
    SourceRedundant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub resolution: Resolution,
    /// True when AskUser degraded to Rename for lack of a user to ask.
    pub ask_degraded: bool,
}

impl Decision {
    fn of(resolution: Resolution) -> Self {
        Self {
            resolution,
            ask_degraded: false,
        }
    }
}

/// Decide the outcome for `source` -> `target` under `strategy`.
pub fn resolve_collision(source: &Path, target: &Path, strategy: Strategy) -> Decision {
    if !target.exists() {
        return Decision::of(Resolution::UseTarget);
    }

    match strategy {
        Strategy::Skip => Decision::of(Resolution::SkipExisting),

        Strategy::Rename => Decision::of(Resolution::Renamed(allocate(target))),

        Strategy::ReplaceIfSame => {
            if checksum::identical(source, target) {
                debug!(source = %source.display(), target = %target.display(), "content identical; source redundant");
                Decision::of(Resolution::SourceRedundant)
            } else {
                Decision::of(Resolution::Renamed(allocate(target)))
            }
        }

        Strategy::ReplaceIfNewer => match (mtime(source), mtime(target)) {
            (Some(src_t), Some(dst_t)) if src_t > dst_t => {
                Decision::of(Resolution::ReplaceAfterBackup)
            }
            // Not strictly newer, or timestamps unreadable: renaming is the
            // safe answer either way.
            _ => Decision::of(Resolution::Renamed(allocate(target))),
        },

        Strategy::BackupAndReplace => Decision::of(Resolution::ReplaceAfterBackup),

        Strategy::AskUser => {
            trace!(target = %target.display(), "no interactive user; degrading ask-user to rename");
            Decision {
                resolution: Resolution::Renamed(allocate(target)),
                ask_degraded: true,
            }
        }
    }
}

fn mtime(path: &Path) -> Option<FileTime> {
    fs::metadata(path)
        .ok()
        .map(|m| FileTime::from_last_modification_time(&m))
}
