//! CLI definition and parsing.
//! Defines Args/Command and provides parse() for command-line handling.
//!
//! Notes:
//! - `move` is dry-run by default; --live performs the mutations.
//! - Strategy names are parsed lossily: unknown names become `rename`.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use reloc::config::{Config, LogLevel};

/// CLI wrapper for the reloc library.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Move files safely: collision strategies, an audit trail, and undo"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Override the audit database path (normally configured via XML).
    #[arg(long, global = true, value_hint = ValueHint::FilePath, help = "Override the audit database path")]
    pub db_path: Option<PathBuf>,

    /// Override the backup directory (normally configured via XML).
    #[arg(long, global = true, value_hint = ValueHint::DirPath, help = "Override the backup directory")]
    pub backup_dir: Option<PathBuf>,

    /// Print where reloc will look for the config file (or RELOC_CONFIG if set), then exit.
    #[arg(long, help = "Print the config file location used by reloc and exit")]
    pub print_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Move a file (or, with --recursive, a directory tree) to a target.
    /// Dry-run unless --live is given.
    Move {
        /// File to move (or directory with --recursive).
        #[arg(value_hint = ValueHint::AnyPath)]
        source: PathBuf,

        /// Destination path. An existing directory means "into it, same name".
        #[arg(value_hint = ValueHint::AnyPath)]
        target: PathBuf,

        /// Collision strategy: skip, rename, replace-if-same, replace-if-newer,
        /// backup-and-replace, ask-user. Unknown names fall back to rename.
        #[arg(long, help = "Collision strategy (unknown names fall back to rename)")]
        strategy: Option<String>,

        /// Actually move files. Without this flag the batch is a dry run.
        #[arg(long, help = "Perform the moves (default is a dry run)")]
        live: bool,

        /// Expand a source directory into one move per contained file.
        #[arg(short = 'r', long, help = "Recurse into a source directory")]
        recursive: bool,
    },

    /// List recently recorded operations.
    History {
        /// How many days back to list.
        #[arg(long, default_value_t = 7, help = "How many days back to list")]
        days: u32,
    },

    /// Reverse a recorded session, restoring files to their original paths.
    Undo {
        /// Session id as shown by `history`.
        session_id: String,

        /// Actually restore. Without this flag the undo is previewed only.
        #[arg(long, help = "Perform the restore (default is a preview)")]
        confirm: bool,
    },
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(db) = &self.db_path {
            cfg.audit_db = db.clone();
        }
        if let Some(bk) = &self.backup_dir {
            cfg.backup_dir = bk.clone();
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
