//! Backup store: preserves a file that is about to be overwritten.
//!
//! Layout: `<root>/<session_id>/<filename>`, so one batch's backups live
//! together and a later operator can correlate them with the audit trail.
//! Backups are written with the durable copy-then-rename path and are never
//! reaped automatically.

use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::allocate::allocate;
use super::copy::safe_copy_and_rename;
use super::helpers::io_error_with_help;

#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `target` into the session's backup directory and return the
    /// backup path. The original stays in place; the caller overwrites it
    /// only after this returns Ok.
    pub fn preserve(&self, target: &Path, session_id: &str) -> Result<PathBuf> {
        let dir = self.root.join(session_id);
        fs::create_dir_all(&dir).map_err(io_error_with_help("create backup directory", &dir))?;

        let name = target
            .file_name()
            .ok_or_else(|| anyhow!("backup target has no file name: {}", target.display()))?;
        let dest = allocate(&dir.join(name));

        safe_copy_and_rename(target, &dest)?;
        info!(target = %target.display(), backup = %dest.display(), "Backed up existing target");
        Ok(dest)
    }
}
