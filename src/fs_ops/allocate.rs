//! Free-name allocation for collision renames.
//!
//! Policy:
//! - An absent target is returned unchanged.
//! - A stem already carrying a numeric `_N` suffix resumes probing at `N+1`,
//!   so repeated moves of `file_1.txt` yield `file_2.txt`, never
//!   `file_1_1.txt` (no suffix accumulation).
//! - Probing is bounded; past the bound a timestamp suffix is appended,
//!   which is fresh to second resolution.
//!
//! This is a pure computation over current filesystem state: it only checks
//! existence and never creates or reserves the name. Callers must re-check
//! before use; sequential batch execution is the race guard.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::trace;

const MAX_NUMERIC_PROBES: u64 = 999;

/// Derive a free path for `target`, probing numeric suffixes.
pub fn allocate(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }

    let stem: OsString = target
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("file"));
    let ext: Option<OsString> = target.extension().map(|e| e.to_os_string());

    // Resume from an existing trailing index instead of stacking suffixes.
    let (base, start): (OsString, u64) = match stem.to_str().and_then(split_trailing_index) {
        Some((prefix, n)) => (OsString::from(prefix), n.saturating_add(1)),
        None => (stem, 1),
    };

    for offset in 0..MAX_NUMERIC_PROBES {
        let i = start.saturating_add(offset);
        let candidate = target.with_file_name(compose(&base, &format!("_{i}"), ext.as_deref()));
        if !candidate.exists() {
            if offset > 0 {
                trace!(target = %target.display(), probes = offset + 1, "allocated after collisions");
            }
            return candidate;
        }
    }

    // Pathological collision density: fall back to a timestamp suffix.
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    target.with_file_name(compose(&base, &format!("_{stamp}"), ext.as_deref()))
}

/// Split a trailing `_N` index off a stem: "report_2" -> ("report", 2).
fn split_trailing_index(stem: &str) -> Option<(&str, u64)> {
    let (prefix, tail) = stem.rsplit_once('_')?;
    if prefix.is_empty() || tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse::<u64>().ok().map(|n| (prefix, n))
}

/// Build "<base><suffix>[.<ext>]", preserving non-UTF8 names.
fn compose(base: &OsStr, suffix: &str, ext: Option<&OsStr>) -> OsString {
    let mut name = OsString::new();
    name.push(base);
    name.push(suffix);
    if let Some(e) = ext {
        name.push(".");
        name.push(e);
    }
    name
}
