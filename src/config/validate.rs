//! Config validation: ensure the audit/backup area exists and is writable
//! before any file is touched.

use anyhow::{Context, Result, bail};
use std::fs;
use tracing::{debug, error, info};

use super::types::Config;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Ensure required directories exist and are usable.
///
/// - backup_dir is created if missing and must accept writes.
/// - the audit db's parent directory is created if missing.
pub fn validate_and_normalize(cfg: &Config) -> Result<()> {
    if cfg.backup_dir.exists() && !cfg.backup_dir.is_dir() {
        error!("Backup path exists but isn't a directory: {}", cfg.backup_dir.display());
        bail!(
            "Backup path exists but isn't a directory: {}",
            cfg.backup_dir.display()
        );
    }
    if !cfg.backup_dir.exists() {
        fs::create_dir_all(&cfg.backup_dir).with_context(|| {
            format!("Failed to create backup directory '{}'", cfg.backup_dir.display())
        })?;
        #[cfg(unix)]
        {
            let _ = fs::set_permissions(&cfg.backup_dir, fs::Permissions::from_mode(0o700));
        }
        info!("Created backup directory: {}", cfg.backup_dir.display());
    }

    // writability probe: create & remove a small temp file
    let probe = cfg
        .backup_dir
        .join(format!(".reloc_probe_{}.tmp", std::process::id()));
    match fs::OpenOptions::new().create_new(true).write(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            debug!("Backup directory writable: {}", cfg.backup_dir.display());
        }
        Err(e) => {
            error!("Cannot write to backup directory '{}': {}", cfg.backup_dir.display(), e);
            bail!(
                "Cannot write to backup directory '{}': {}. Check directory permissions.",
                cfg.backup_dir.display(),
                e
            );
        }
    }

    if let Some(parent) = cfg.audit_db.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create audit database directory '{}'", parent.display())
        })?;
    }

    debug!(
        "Config validated: audit_db='{}' backup_dir='{}'",
        cfg.audit_db.display(),
        cfg.backup_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directories() {
        let td = tempdir().unwrap();
        let cfg = Config {
            audit_db: td.path().join("state").join("audit.db"),
            backup_dir: td.path().join("backups"),
            ..Config::default()
        };
        validate_and_normalize(&cfg).unwrap();
        assert!(cfg.backup_dir.is_dir());
        assert!(td.path().join("state").is_dir());
    }

    #[test]
    fn rejects_file_in_place_of_backup_dir() {
        let td = tempdir().unwrap();
        let clash = td.path().join("backups");
        fs::write(&clash, b"not a dir").unwrap();
        let cfg = Config {
            audit_db: td.path().join("audit.db"),
            backup_dir: clash,
            ..Config::default()
        };
        assert!(validate_and_normalize(&cfg).is_err());
    }
}
