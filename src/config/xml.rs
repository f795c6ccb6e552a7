//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a commented template if missing (unless RELOC_CONFIG is set).
//!
//! Notes:
//! - This module only reads/writes the config file; directory creation and
//!   writability checks happen in validate.
//! - Unknown XML fields are a hard error to surface misconfigurations early.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::model::Strategy;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    audit_db: Option<String>,
    backup_dir: Option<String>,
    default_strategy: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
}

/// Result of resolving the config file at startup.
pub enum LoadResult {
    /// A config file existed and parsed.
    Loaded(Config),
    /// No config existed; a template was written at this path.
    CreatedTemplate(PathBuf),
    /// No config and no template could be created; defaults apply.
    Defaults,
}

/// Resolve configuration: RELOC_CONFIG wins, then the platform default path.
/// A missing default config is seeded with a template (best-effort).
pub fn load_or_init() -> Result<LoadResult> {
    if let Some(p) = env::var_os("RELOC_CONFIG") {
        let path = PathBuf::from(p);
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg));
    }

    let path = match default_config_path() {
        Ok(p) => p,
        Err(_) => return Ok(LoadResult::Defaults),
    };

    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg));
    }

    match create_template_config(&path) {
        Ok(()) => Ok(LoadResult::CreatedTemplate(path)),
        Err(e) => {
            eprintln!(
                "Failed to create template config at {}: {}",
                path.display(),
                e
            );
            Ok(LoadResult::Defaults)
        }
    }
}

/// Load a Config from a specific XML file path (quick_xml).
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = match from_xml_str(&contents) {
        Ok(x) => x,
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("unknown field") {
                bail!(
                    "Unknown field in reloc config {}: {}. Refusing to start.",
                    path.display(),
                    msg
                );
            }
            return Err(e).with_context(|| format!("parse config xml '{}'", path.display()));
        }
    };
    Ok(xml_to_config(parsed))
}

fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();

    if let Some(s) = nonempty(parsed.audit_db.as_deref()) {
        cfg.audit_db = PathBuf::from(s);
    }
    if let Some(s) = nonempty(parsed.backup_dir.as_deref()) {
        cfg.backup_dir = PathBuf::from(s);
    }
    if let Some(s) = nonempty(parsed.default_strategy.as_deref()) {
        cfg.default_strategy = Strategy::parse_lossy(s);
    }
    if let Some(s) = nonempty(parsed.log_level.as_deref())
        && let Some(level) = LogLevel::parse(s)
    {
        cfg.log_level = level;
    }
    if let Some(s) = nonempty(parsed.log_file.as_deref()) {
        cfg.log_file = Some(PathBuf::from(s));
    }

    cfg
}

fn nonempty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

/// Create the default template config file and parent directory with
/// conservative permissions. Refuses symlinked ancestors on principle: the
/// config decides where files get moved.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/reloc.log".into());

    let content = format!(
        "<!--\n  reloc configuration (XML)\n\n  Fields:\n    audit_db          -> SQLite file recording every live move (the undo journal)\n    backup_dir        -> where overwritten targets are preserved\n    default_strategy  -> skip | rename | replace-if-same | replace-if-newer | backup-and-replace | ask-user\n    log_level         -> quiet | normal | info | debug\n    log_file          -> path to log file (optional; stdout/stderr still used)\n\n  Notes:\n    - CLI flags override XML values.\n    - Unknown strategy names fall back to rename.\n-->\n<config>\n  <default_strategy>rename</default_strategy>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n</config>\n",
        suggested_log
    );

    write_new_file_0600(path, content.as_bytes())
        .with_context(|| format!("write template config '{}'", path.display()))?;

    info!("Created template config at {}", path.display());
    Ok(())
}

/// Create-new write that never follows a pre-existing symlink at `path`.
fn write_new_file_0600(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600).custom_flags(libc::O_NOFOLLOW);
    }
    let mut f = opts.open(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

fn set_dir_mode_0700(dir: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Best-effort; odd filesystems may refuse and that's fine.
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
    }
    #[cfg(not(unix))]
    let _ = dir;
}
