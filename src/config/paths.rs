//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/data/log paths and detects symlinked
//! ancestors for safety.

use anyhow::{Result, anyhow};
use dirs::{config_dir, data_dir};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn app_data_dir() -> Result<PathBuf> {
    data_dir()
        .map(|mut base| {
            base.push("reloc");
            base
        })
        .ok_or_else(|| anyhow!("could not determine a platform data directory"))
}

/// OS-appropriate default config path.
pub fn default_config_path() -> Result<PathBuf> {
    config_dir()
        .map(|mut base| {
            base.push("reloc");
            base.push("config.xml");
            base
        })
        .ok_or_else(|| anyhow!("could not determine a platform config directory"))
}

/// Default audit database path (data dir).
pub fn default_db_path() -> Result<PathBuf> {
    let mut base = app_data_dir()?;
    base.push("audit.db");
    Ok(base)
}

/// Default backup store root (data dir).
pub fn default_backup_dir() -> Result<PathBuf> {
    let mut base = app_data_dir()?;
    base.push("backups");
    Ok(base)
}

/// Default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    let mut base = app_data_dir()?;
    base.push("reloc.log");
    Ok(base)
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
