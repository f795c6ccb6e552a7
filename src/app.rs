//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler,
//! validates the audit/backup area, and dispatches the subcommand.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};
use walkdir::WalkDir;

use reloc::audit::AuditLog;
use reloc::batch::BatchCoordinator;
use reloc::config::{self, Config, LoadResult, validate_and_normalize};
use reloc::errors::RelocError;
use reloc::fs_ops::lock::try_acquire_area_lock;
use reloc::model::{MoveOperation, MoveSession, Outcome, Strategy};
use reloc::output as out;
use reloc::shutdown;

use crate::cli::{Args, Command};
use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(());
    }

    // Build config: XML (or template creation) first, CLI overrides win.
    let mut cfg = match config::load_or_init()? {
        LoadResult::Loaded(c) => c,
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!(
                "A template reloc config was written to: {}",
                path.display()
            ));
            out::print_info(
                "Edit it to set `audit_db`, `backup_dir`, `default_strategy`, `log_level` and `log_file`. Defaults apply for this run. To use a different location set RELOC_CONFIG.",
            );
            Config::default()
        }
        LoadResult::Defaults => Config::default(),
    };
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt: Option<tracing_appender::non_blocking::WorkerGuard> =
        init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
            out::print_error(&format!("Failed to initialize logging: {}", e));
            e
        })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; finishing the current file then stopping...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
        })
        .context("failed to install signal handler")?;
    }

    debug!("Starting reloc: {:?}", args);

    let result = match args.command.clone() {
        None => {
            use clap::CommandFactory;
            let _ = Args::command().print_long_help();
            Ok(())
        }
        Some(Command::Move {
            source,
            target,
            strategy,
            live,
            recursive,
        }) => run_move(&cfg, &source, &target, strategy.as_deref(), live, recursive),
        Some(Command::History { days }) => run_history(&cfg, days),
        Some(Command::Undo {
            session_id,
            confirm,
        }) => run_undo(&cfg, &session_id, confirm),
    };

    if let Err(e) = &result {
        if let Some(re) = e.downcast_ref::<RelocError>() {
            error!(code = re.code(), error = %re, "command failed");
        } else {
            error!(error = ?e, "command failed");
        }
    }

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn print_config_location() {
    if let Ok(cfg_env) = std::env::var("RELOC_CONFIG") {
        out::print_info(&format!("Using RELOC_CONFIG (explicit):\n  {}\n", cfg_env));
        out::print_info("To override, unset RELOC_CONFIG or set it to another file.");
        return;
    }
    match config::default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default reloc config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info(
                    "No config file exists there yet. Run any command to create a template.",
                );
            }
        }
        Err(e) => {
            out::print_error(&format!("Could not determine a default config path: {e}"));
        }
    }
}

fn run_move(
    cfg: &Config,
    source: &Path,
    target: &Path,
    strategy: Option<&str>,
    live: bool,
    recursive: bool,
) -> Result<()> {
    let strategy = strategy
        .map(Strategy::parse_lossy)
        .unwrap_or(cfg.default_strategy);
    let dry_run = !live;
    let pairs = build_pairs(source, target, recursive)?;
    if pairs.is_empty() {
        out::print_info("Nothing to move.");
        return Ok(());
    }

    if dry_run {
        let coordinator = BatchCoordinator::new(cfg.backup_dir.clone(), None);
        let (session, ops) = coordinator.run_batch(&pairs, strategy, true)?;
        report_ops(&ops, true);
        print_summary(&session, true);
        out::print_info("Dry run only. Re-run with --live to perform these moves.");
        return Ok(());
    }

    validate_and_normalize(cfg)?;
    let _area_lock = acquire_lock(cfg)?;
    let audit = AuditLog::open(&cfg.audit_db)
        .map_err(RelocError::Audit)
        .with_context(|| format!("open audit store '{}'", cfg.audit_db.display()))?;
    let coordinator = BatchCoordinator::new(cfg.backup_dir.clone(), Some(&audit));
    let (session, ops) = coordinator.run_batch(&pairs, strategy, false)?;
    report_ops(&ops, false);
    print_summary(&session, false);
    out::print_info(&format!(
        "Recorded as session {}. Undo with: reloc undo {} --confirm",
        session.session_id, session.session_id
    ));
    Ok(())
}

fn run_history(cfg: &Config, days: u32) -> Result<()> {
    if !cfg.audit_db.exists() {
        out::print_info("No history recorded yet.");
        return Ok(());
    }
    let audit = AuditLog::open(&cfg.audit_db)?;
    let records = audit.list_operations(days)?;
    if records.is_empty() {
        out::print_info(&format!("No operations recorded in the last {days} day(s)."));
        return Ok(());
    }
    for r in &records {
        let what = match (r.outcome, r.resolved_path.as_deref()) {
            (Outcome::Success, Some(resolved)) => format!(
                "{} '{}' -> '{}'",
                r.kind.as_str(),
                r.source_path.display(),
                resolved.display()
            ),
            (Outcome::Skipped, _) => {
                format!("skipped '{}'", r.source_path.display())
            }
            _ => format!(
                "failed '{}': {}",
                r.source_path.display(),
                r.error.as_deref().unwrap_or("unknown error")
            ),
        };
        out::print_user(&format!("{}  [{}]  {}", r.recorded_at, r.session_id, what));
    }
    out::print_info(&format!(
        "{} operation(s). Undo a session with: reloc undo <session-id> --confirm",
        records.len()
    ));
    Ok(())
}

fn run_undo(cfg: &Config, session_id: &str, confirm: bool) -> Result<()> {
    if !cfg.audit_db.exists() {
        out::print_info("No history recorded yet.");
        return Ok(());
    }
    let audit = AuditLog::open(&cfg.audit_db)?;
    let records = audit.list_operations_for_session(session_id)?;
    if records.is_empty() {
        out::print_info(&format!(
            "No undoable operations recorded for session {session_id}."
        ));
        return Ok(());
    }

    if !confirm {
        out::print_info(&format!(
            "Session {} has {} restorable file(s):",
            session_id,
            records.len()
        ));
        for r in &records {
            if let Some(resolved) = &r.resolved_path {
                out::print_user(&format!(
                    "would restore '{}' -> '{}'",
                    resolved.display(),
                    r.source_path.display()
                ));
            }
        }
        out::print_info("Pass --confirm to restore them.");
        return Ok(());
    }

    let _area_lock = acquire_lock(cfg)?;
    let coordinator = BatchCoordinator::new(cfg.backup_dir.clone(), Some(&audit));
    let (session, ops) = coordinator.undo_session(session_id)?;
    for op in &ops {
        match op.outcome {
            Outcome::Success => out::print_user(&format!(
                "restored '{}' -> '{}'",
                op.source_path.display(),
                op.target_path.display()
            )),
            _ => out::print_user(&format!(
                "failed to restore '{}': {}",
                op.source_path.display(),
                op.error.as_deref().unwrap_or("unknown error")
            )),
        }
    }
    if session.failed == 0 {
        out::print_success(&format!("Restored {} file(s).", session.succeeded));
    } else {
        out::print_warn(&format!(
            "Restored {} file(s); {} failed. Failed files stay where they are — reconcile by hand or re-run undo.",
            session.succeeded, session.failed
        ));
    }
    Ok(())
}

/// Serialize whole-tool invocations via the audit area lock.
fn acquire_lock(cfg: &Config) -> Result<reloc::fs_ops::AreaLock> {
    let dir = cfg
        .audit_db
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match try_acquire_area_lock(dir)? {
        Some(lock) => Ok(lock),
        None => Err(RelocError::LockHeld(dir.join(".reloc.lock")).into()),
    }
}

/// Expand the CLI's (source, target) into absolute per-file pairs.
fn build_pairs(source: &Path, target: &Path, recursive: bool) -> Result<Vec<(PathBuf, PathBuf)>> {
    let source = dunce::canonicalize(source)
        .map_err(|_| RelocError::SourceNotFound(source.to_path_buf()))?;
    let target = std::path::absolute(target)
        .with_context(|| format!("resolve target path '{}'", target.display()))?;

    if source.is_dir() {
        if !recursive {
            bail!(
                "'{}' is a directory; pass --recursive to move its files",
                source.display()
            );
        }
        let mut pairs = Vec::new();
        for entry in WalkDir::new(&source)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let rel = entry.path().strip_prefix(&source)?.to_path_buf();
            pairs.push((entry.into_path(), target.join(rel)));
        }
        // Walk order varies by filesystem; sort for deterministic batches.
        pairs.sort();
        Ok(pairs)
    } else {
        let dest = if target.is_dir() {
            let name = source
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("source has no file name: {}", source.display()))?;
            target.join(name)
        } else {
            target
        };
        Ok(vec![(source, dest)])
    }
}

fn report_ops(ops: &[MoveOperation], dry_run: bool) {
    for op in ops {
        let line = describe_op(op, dry_run);
        out::print_user(&line);
    }
}

fn describe_op(op: &MoveOperation, dry_run: bool) -> String {
    let verb = if dry_run { "would move" } else { "moved" };
    match op.outcome {
        Outcome::Success => {
            let resolved = op
                .resolved_path
                .as_deref()
                .unwrap_or(op.target_path.as_path());
            let mut line = format!(
                "{} '{}' -> '{}'",
                verb,
                op.source_path.display(),
                resolved.display()
            );
            if let Some(backup) = &op.backup_path {
                line.push_str(&format!(" (previous file backed up to '{}')", backup.display()));
            }
            if op.ask_degraded {
                line.push_str(" (ask-user unavailable; renamed instead)");
            }
            line
        }
        Outcome::Skipped => format!(
            "{} '{}' (target exists)",
            if dry_run { "would skip" } else { "skipped" },
            op.source_path.display()
        ),
        Outcome::Failed => format!(
            "failed '{}': {}",
            op.source_path.display(),
            op.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn print_summary(session: &MoveSession, dry_run: bool) {
    let heading = if dry_run { "Dry-run summary" } else { "Summary" };
    out::print_success(&format!(
        "{}: {} file(s) — {} moved, {} skipped, {} failed",
        heading, session.total, session.succeeded, session.skipped, session.failed
    ));
}
