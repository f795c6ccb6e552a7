use std::fs;
use std::io::Write;
use std::path::PathBuf;

use reloc::audit::AuditLog;
use reloc::batch::BatchCoordinator;
use reloc::model::{Outcome, Strategy};
use tempfile::tempdir;

fn write_file(path: &PathBuf, contents: &str) {
    let mut f = fs::File::create(path).expect("create file");
    write!(f, "{}", contents).expect("write file");
    f.sync_all().expect("sync file");
}

fn snapshot(dir: &std::path::Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut entries: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let p = e.into_path();
            let bytes = fs::read(&p).unwrap();
            (p, bytes)
        })
        .collect();
    entries.sort();
    entries
}

/// A dry-run batch produces a faithful preview but leaves both the disk and
/// the audit store completely unchanged.
#[test]
fn dry_run_changes_nothing() {
    let root = tempdir().unwrap();
    let src_dir = root.path().join("in");
    let dst_dir = root.path().join("out");
    let backup_dir = root.path().join("backups");
    fs::create_dir_all(&src_dir).unwrap();
    fs::create_dir_all(&dst_dir).unwrap();

    write_file(&src_dir.join("a.txt"), "a");
    write_file(&src_dir.join("b.txt"), "b");
    write_file(&dst_dir.join("b.txt"), "existing");

    let audit = AuditLog::open(&root.path().join("audit.db")).unwrap();
    let before = snapshot(root.path());

    let coordinator = BatchCoordinator::new(backup_dir.clone(), Some(&audit));
    let pairs = vec![
        (src_dir.join("a.txt"), dst_dir.join("a.txt")),
        (src_dir.join("b.txt"), dst_dir.join("b.txt")),
    ];
    let (session, ops) = coordinator
        .run_batch(&pairs, Strategy::Rename, true)
        .expect("dry run should succeed");

    // The preview is complete: plain move plus a collision rename.
    assert!(session.dry_run);
    assert_eq!(session.total, 2);
    assert_eq!(session.succeeded, 2);
    assert_eq!(ops[0].resolved_path.as_deref(), Some(dst_dir.join("a.txt").as_path()));
    assert_eq!(ops[1].resolved_path.as_deref(), Some(dst_dir.join("b_1.txt").as_path()));

    // Nothing on disk moved, no backups appeared.
    assert_eq!(snapshot(root.path()), before);
    assert!(!backup_dir.exists());

    // The store recorded neither operations nor the session.
    assert!(audit.list_operations(1).unwrap().is_empty());
    assert!(audit.session(&session.session_id).unwrap().is_none());
}

/// Dry-run previews skips too, so a caller can see what would NOT happen.
#[test]
fn dry_run_previews_skip_decisions() {
    let root = tempdir().unwrap();
    let src = root.path().join("src.txt");
    let dst = root.path().join("dst.txt");
    write_file(&src, "s");
    write_file(&dst, "d");

    let coordinator = BatchCoordinator::new(root.path().join("backups"), None);
    let (session, ops) = coordinator
        .run_batch(&[(src.clone(), dst.clone())], Strategy::Skip, true)
        .unwrap();

    assert_eq!(ops[0].outcome, Outcome::Skipped);
    assert_eq!(session.skipped, 1);
    assert!(src.exists());
}

/// The dry-run flag is honored per batch: the same coordinator inputs run
/// live afterwards behave normally.
#[test]
fn live_run_after_dry_run_moves_files() {
    let root = tempdir().unwrap();
    let src = root.path().join("file.txt");
    let dst_dir = root.path().join("out");
    fs::create_dir_all(&dst_dir).unwrap();
    write_file(&src, "content");

    let audit = AuditLog::open(&root.path().join("audit.db")).unwrap();
    let coordinator = BatchCoordinator::new(root.path().join("backups"), Some(&audit));
    let pairs = vec![(src.clone(), dst_dir.join("file.txt"))];

    coordinator.run_batch(&pairs, Strategy::Rename, true).unwrap();
    assert!(src.exists(), "dry run left the file");

    let (session, _) = coordinator.run_batch(&pairs, Strategy::Rename, false).unwrap();
    assert!(!src.exists());
    assert_eq!(fs::read_to_string(dst_dir.join("file.txt")).unwrap(), "content");
    assert_eq!(audit.session(&session.session_id).unwrap().unwrap().succeeded, 1);
}
