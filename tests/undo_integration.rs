use std::fs;
use std::io::Write;
use std::path::PathBuf;

use reloc::audit::{AuditLog, OpKind};
use reloc::batch::BatchCoordinator;
use reloc::model::{Outcome, Strategy};
use tempfile::tempdir;

fn write_file(path: &PathBuf, contents: &str) {
    let mut f = fs::File::create(path).expect("create file");
    write!(f, "{}", contents).expect("write file");
    f.sync_all().expect("sync file");
}

/// Move a file under the Rename strategy, undo the session, and verify the
/// file is back at its original path with unchanged content — while the
/// audit store keeps the original records and gains undo records.
#[test]
fn undo_restores_original_path_and_appends_history() {
    let root = tempdir().unwrap();
    let src_dir = root.path().join("in");
    let dst_dir = root.path().join("out");
    fs::create_dir_all(&src_dir).unwrap();
    fs::create_dir_all(&dst_dir).unwrap();

    let audit = AuditLog::open(&root.path().join("audit.db")).unwrap();
    let coordinator = BatchCoordinator::new(root.path().join("backups"), Some(&audit));

    let a = src_dir.join("a.txt");
    write_file(&a, "payload");
    // Target name is taken, so the move lands at b_1.txt.
    write_file(&dst_dir.join("b.txt"), "occupant");

    let pairs = vec![(a.clone(), dst_dir.join("b.txt"))];
    let (move_session, ops) = coordinator.run_batch(&pairs, Strategy::Rename, false).unwrap();
    let resolved = ops[0].resolved_path.clone().unwrap();
    assert!(!a.exists());
    assert_eq!(fs::read_to_string(&resolved).unwrap(), "payload");

    let (undo_session, undo_ops) = coordinator.undo_session(&move_session.session_id).unwrap();

    assert_eq!(undo_session.succeeded, 1);
    assert_eq!(undo_session.failed, 0);
    assert_eq!(undo_session.undo_of.as_deref(), Some(move_session.session_id.as_str()));
    assert_eq!(undo_ops[0].outcome, Outcome::Success);
    assert_eq!(fs::read_to_string(&a).unwrap(), "payload");
    assert!(!resolved.exists());

    // History: original rows still there, undo rows appended.
    let all = audit.list_operations(1).unwrap();
    let moves = all.iter().filter(|r| r.kind == OpKind::Move).count();
    let undos = all.iter().filter(|r| r.kind == OpKind::Undo).count();
    assert_eq!(moves, 1);
    assert_eq!(undos, 1);
    let undo_row = all.iter().find(|r| r.kind == OpKind::Undo).unwrap();
    assert_eq!(undo_row.session_id, undo_session.session_id);
}

/// An occupied original location is a conflict: that file's undo fails, and
/// the remaining undos still run.
#[test]
fn undo_is_best_effort_on_conflicts() {
    let root = tempdir().unwrap();
    let src_dir = root.path().join("in");
    let dst_dir = root.path().join("out");
    fs::create_dir_all(&src_dir).unwrap();
    fs::create_dir_all(&dst_dir).unwrap();

    let audit = AuditLog::open(&root.path().join("audit.db")).unwrap();
    let coordinator = BatchCoordinator::new(root.path().join("backups"), Some(&audit));

    let one = src_dir.join("one.txt");
    let two = src_dir.join("two.txt");
    write_file(&one, "1");
    write_file(&two, "2");
    let pairs = vec![
        (one.clone(), dst_dir.join("one.txt")),
        (two.clone(), dst_dir.join("two.txt")),
    ];
    let (session, _) = coordinator.run_batch(&pairs, Strategy::Rename, false).unwrap();

    // Reoccupy one original slot before undoing.
    write_file(&one, "squatter");

    let (undo_session, undo_ops) = coordinator.undo_session(&session.session_id).unwrap();

    assert_eq!(undo_session.succeeded, 1);
    assert_eq!(undo_session.failed, 1);
    // The squatter is untouched and the conflicting file stays where it was.
    assert_eq!(fs::read_to_string(&one).unwrap(), "squatter");
    assert!(dst_dir.join("one.txt").exists());
    // The other file went home.
    assert_eq!(fs::read_to_string(&two).unwrap(), "2");

    let failed = undo_ops.iter().find(|op| op.outcome == Outcome::Failed).unwrap();
    assert!(failed.error.as_deref().unwrap().contains("occupied"));
}

/// A resolved file that disappeared since the move counts as a failed undo.
#[test]
fn undo_counts_missing_resolved_files() {
    let root = tempdir().unwrap();
    let src_dir = root.path().join("in");
    let dst_dir = root.path().join("out");
    fs::create_dir_all(&src_dir).unwrap();
    fs::create_dir_all(&dst_dir).unwrap();

    let audit = AuditLog::open(&root.path().join("audit.db")).unwrap();
    let coordinator = BatchCoordinator::new(root.path().join("backups"), Some(&audit));

    let f = src_dir.join("gone.txt");
    write_file(&f, "x");
    let pairs = vec![(f.clone(), dst_dir.join("gone.txt"))];
    let (session, ops) = coordinator.run_batch(&pairs, Strategy::Rename, false).unwrap();

    fs::remove_file(ops[0].resolved_path.as_ref().unwrap()).unwrap();

    let (undo_session, _) = coordinator.undo_session(&session.session_id).unwrap();
    assert_eq!(undo_session.succeeded, 0);
    assert_eq!(undo_session.failed, 1);
}

/// Only successes are undoable: skipped and failed operations produce no
/// restore attempts.
#[test]
fn undo_ignores_skips_and_failures() {
    let root = tempdir().unwrap();
    let src_dir = root.path().join("in");
    let dst_dir = root.path().join("out");
    fs::create_dir_all(&src_dir).unwrap();
    fs::create_dir_all(&dst_dir).unwrap();

    let audit = AuditLog::open(&root.path().join("audit.db")).unwrap();
    let coordinator = BatchCoordinator::new(root.path().join("backups"), Some(&audit));

    let moved = src_dir.join("moved.txt");
    write_file(&moved, "m");
    let skipped = src_dir.join("skipped.txt");
    write_file(&skipped, "s");
    write_file(&dst_dir.join("skipped.txt"), "taken");

    let pairs = vec![
        (moved.clone(), dst_dir.join("moved.txt")),
        (skipped.clone(), dst_dir.join("skipped.txt")),
        (src_dir.join("absent.txt"), dst_dir.join("absent.txt")),
    ];
    let (session, _) = coordinator.run_batch(&pairs, Strategy::Skip, false).unwrap();
    assert_eq!(session.succeeded, 1);

    let (undo_session, undo_ops) = coordinator.undo_session(&session.session_id).unwrap();
    assert_eq!(undo_ops.len(), 1, "only the success is restorable");
    assert_eq!(undo_session.succeeded, 1);
    assert!(moved.exists());
    assert!(skipped.exists(), "skipped source never moved");
}

/// Undoing a session with no recorded successes reports an error instead of
/// silently doing nothing.
#[test]
fn undo_unknown_session_is_an_error() {
    let root = tempdir().unwrap();
    let audit = AuditLog::open(&root.path().join("audit.db")).unwrap();
    let coordinator = BatchCoordinator::new(root.path().join("backups"), Some(&audit));
    let err = coordinator.undo_session("1234-99999").unwrap_err();
    assert!(err.to_string().contains("no undoable operations"));
}
