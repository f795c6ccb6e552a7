use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use filetime::{FileTime, set_file_mtime};
use reloc::audit::AuditLog;
use reloc::batch::BatchCoordinator;
use reloc::model::{Outcome, Strategy};
use tempfile::{TempDir, tempdir};

fn write_file(path: &PathBuf, contents: &str) {
    let mut f = fs::File::create(path).expect("create file");
    write!(f, "{}", contents).expect("write file");
    f.sync_all().expect("sync file");
    assert!(
        path.exists(),
        "write_file helper failed to create file: {}",
        path.display()
    );
}

struct World {
    _root: TempDir,
    src_dir: PathBuf,
    dst_dir: PathBuf,
    backup_dir: PathBuf,
}

impl World {
    fn new() -> Self {
        let root = tempdir().expect("tempdir");
        let src_dir = root.path().join("incoming");
        let dst_dir = root.path().join("sorted");
        let backup_dir = root.path().join("backups");
        fs::create_dir_all(&src_dir).unwrap();
        fs::create_dir_all(&dst_dir).unwrap();
        Self {
            _root: root,
            src_dir,
            dst_dir,
            backup_dir,
        }
    }

    fn run_one(
        &self,
        audit: &AuditLog,
        source: &Path,
        target: &Path,
        strategy: Strategy,
    ) -> reloc::model::MoveOperation {
        let coordinator = BatchCoordinator::new(self.backup_dir.clone(), Some(audit));
        let pairs = vec![(source.to_path_buf(), target.to_path_buf())];
        let (_, mut ops) = coordinator
            .run_batch(&pairs, strategy, false)
            .expect("batch should run");
        assert_eq!(ops.len(), 1);
        ops.remove(0)
    }
}

#[test]
fn plain_move_without_collision() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("a.txt");
    let dst = w.dst_dir.join("a.txt");
    write_file(&src, "hello");

    let op = w.run_one(&audit, &src, &dst, Strategy::Rename);

    assert_eq!(op.outcome, Outcome::Success);
    assert!(!src.exists());
    assert_eq!(fs::read_to_string(&dst).unwrap(), "hello");
}

#[test]
fn rename_collision_allocates_and_loses_nothing() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("report.txt");
    let dst = w.dst_dir.join("report.txt");
    write_file(&src, "incoming");
    write_file(&dst, "already-there");

    let op = w.run_one(&audit, &src, &dst, Strategy::Rename);

    assert_eq!(op.outcome, Outcome::Success);
    let resolved = op.resolved_path.expect("resolved path set");
    assert_eq!(resolved, w.dst_dir.join("report_1.txt"));
    // Both contents survive: nothing was overwritten.
    assert_eq!(fs::read_to_string(&dst).unwrap(), "already-there");
    assert_eq!(fs::read_to_string(&resolved).unwrap(), "incoming");
    assert!(!src.exists());
}

#[test]
fn skip_leaves_both_files_alone() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("dup.txt");
    let dst = w.dst_dir.join("dup.txt");
    write_file(&src, "source");
    write_file(&dst, "target");

    let op = w.run_one(&audit, &src, &dst, Strategy::Skip);

    assert_eq!(op.outcome, Outcome::Skipped);
    assert!(src.exists());
    assert_eq!(fs::read_to_string(&dst).unwrap(), "target");
}

/// ReplaceIfSame with byte-identical content: the source is deleted, the
/// target stays untouched, and no backup is created.
#[test]
fn replace_if_same_identical_content() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("report.txt");
    let dst = w.dst_dir.join("report.txt");
    write_file(&src, "X");
    write_file(&dst, "X");

    let op = w.run_one(&audit, &src, &dst, Strategy::ReplaceIfSame);

    assert_eq!(op.outcome, Outcome::Success);
    assert!(!src.exists(), "redundant source should be removed");
    assert_eq!(fs::read_to_string(&dst).unwrap(), "X");
    assert!(op.backup_path.is_none(), "no backup for identical content");
    assert!(!w.backup_dir.exists() || fs::read_dir(&w.backup_dir).unwrap().next().is_none());
}

/// ReplaceIfSame with differing content must fall back to the rename path,
/// never silently overwrite.
#[test]
fn replace_if_same_different_content_falls_back_to_rename() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("report.txt");
    let dst = w.dst_dir.join("report.txt");
    write_file(&src, "X");
    write_file(&dst, "Y");

    let op = w.run_one(&audit, &src, &dst, Strategy::ReplaceIfSame);

    assert_eq!(op.outcome, Outcome::Success);
    assert_eq!(op.resolved_path.as_deref(), Some(w.dst_dir.join("report_1.txt").as_path()));
    assert!(!src.exists(), "source should be gone once the rename completes");
    assert_eq!(fs::read_to_string(&dst).unwrap(), "Y", "existing target untouched");
    assert_eq!(
        fs::read_to_string(w.dst_dir.join("report_1.txt")).unwrap(),
        "X",
        "moved content lands at the fallback path"
    );
}

#[test]
fn replace_if_newer_overwrites_with_backup_when_source_newer() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("data.csv");
    let dst = w.dst_dir.join("data.csv");
    write_file(&src, "fresh");
    write_file(&dst, "stale");
    set_file_mtime(&dst, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
    set_file_mtime(&src, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let op = w.run_one(&audit, &src, &dst, Strategy::ReplaceIfNewer);

    assert_eq!(op.outcome, Outcome::Success);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "fresh");
    let backup = op.backup_path.expect("overwritten target must be backed up");
    assert_eq!(fs::read_to_string(&backup).unwrap(), "stale");
}

#[test]
fn replace_if_newer_renames_when_source_is_older() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("data.csv");
    let dst = w.dst_dir.join("data.csv");
    write_file(&src, "old-version");
    write_file(&dst, "current");
    set_file_mtime(&src, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
    set_file_mtime(&dst, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let op = w.run_one(&audit, &src, &dst, Strategy::ReplaceIfNewer);

    assert_eq!(op.outcome, Outcome::Success);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "current");
    assert_eq!(
        fs::read_to_string(w.dst_dir.join("data_1.csv")).unwrap(),
        "old-version"
    );
    assert!(op.backup_path.is_none());
}

#[test]
fn backup_and_replace_always_preserves_old_target() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("cfg.toml");
    let dst = w.dst_dir.join("cfg.toml");
    write_file(&src, "new");
    write_file(&dst, "old");

    let op = w.run_one(&audit, &src, &dst, Strategy::BackupAndReplace);

    assert_eq!(op.outcome, Outcome::Success);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
    let backup = op.backup_path.expect("backup recorded");
    assert_eq!(fs::read_to_string(&backup).unwrap(), "old");
    // Backups are grouped by session.
    let session_dir = backup.parent().unwrap();
    assert_eq!(
        session_dir.parent().unwrap(),
        w.backup_dir.as_path(),
        "backup lives under <backup_dir>/<session_id>/"
    );
}

#[test]
fn ask_user_degrades_to_rename_and_is_flagged() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();
    let src = w.src_dir.join("photo.jpg");
    let dst = w.dst_dir.join("photo.jpg");
    write_file(&src, "a");
    write_file(&dst, "b");

    let op = w.run_one(&audit, &src, &dst, Strategy::AskUser);

    assert_eq!(op.outcome, Outcome::Success);
    assert!(op.ask_degraded, "degradation must be visible in the result");
    assert_eq!(op.resolved_path.as_deref(), Some(w.dst_dir.join("photo_1.jpg").as_path()));
}

#[test]
fn batch_mixes_outcomes_and_counts_them() {
    let w = World::new();
    let audit = AuditLog::open_in_memory().unwrap();

    let ok = w.src_dir.join("ok.txt");
    write_file(&ok, "fine");
    let blocked = w.src_dir.join("blocked.txt");
    write_file(&blocked, "src");
    write_file(&w.dst_dir.join("blocked.txt"), "dst");
    let missing = w.src_dir.join("never-existed.txt");

    let pairs = vec![
        (ok.clone(), w.dst_dir.join("ok.txt")),
        (blocked.clone(), w.dst_dir.join("blocked.txt")),
        (missing.clone(), w.dst_dir.join("missing.txt")),
    ];
    let coordinator = BatchCoordinator::new(w.backup_dir.clone(), Some(&audit));
    let (session, ops) = coordinator
        .run_batch(&pairs, Strategy::Skip, false)
        .expect("per-file failures must not abort the batch");

    assert_eq!(session.total, 3);
    assert_eq!(session.succeeded, 1);
    assert_eq!(session.skipped, 1);
    assert_eq!(session.failed, 1);
    assert_eq!(ops[2].outcome, Outcome::Failed);
    assert!(ops[2].error.as_deref().unwrap().contains("not found"));

    // Every live operation got exactly one audit row.
    let rows = audit.list_operations(1).unwrap();
    assert_eq!(rows.len(), 3);
}
