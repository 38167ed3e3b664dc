use hoist_fs::{Error, FileTime, IgnoredExt, metadata, prepare_dir};
use tempfile::tempdir;

#[test]
fn test_prepare_then_rollback_restores_absence() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("install/app/bin");

    let undo = prepare_dir(&target, 0o750).unwrap();
    std::fs::write(target.join("tool"), "binary").unwrap();
    std::fs::create_dir_all(dir.path().join("install/app/share/doc")).unwrap();

    undo.run().unwrap();

    assert!(!dir.path().join("install").exists());
    assert!(dir.path().exists());
}

#[test]
fn test_prepare_is_idempotent() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("a/b");

    let first = prepare_dir(&target, 0o750).unwrap();
    let second = prepare_dir(&target, 0o750).unwrap();

    assert!(!first.is_noop());
    assert!(second.is_noop());

    second.run().unwrap();
    assert!(target.is_dir());
}

#[test]
fn test_kept_undo_leaves_tree_in_place() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("kept");

    let undo = prepare_dir(&target, 0o750).unwrap();
    drop(undo);

    assert!(target.is_dir());
}

#[test]
fn test_non_directory_ancestor() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("file"), "data").unwrap();

    let result = prepare_dir(dir.path().join("file/a/b"), 0o750);
    match result {
        Err(Error::NotADirectory { path }) => assert_eq!(path, dir.path().join("file")),
        other => panic!("expected NotADirectory, got {other:?}"),
    }
    assert!(!dir.path().join("file/a").exists());
}

#[cfg(unix)]
#[test]
fn test_rollback_failure_is_reported() {
    use std::os::unix::fs::PermissionsExt;

    // Root ignores directory permissions, so the failure cannot be provoked.
    if nix::unistd::Uid::effective().is_root() {
        return;
    }

    let dir = tempdir().unwrap();
    let parent = dir.path().join("locked");
    std::fs::create_dir(&parent).unwrap();

    let undo = prepare_dir(parent.join("child/inner"), 0o750).unwrap();
    std::fs::set_permissions(&parent, std::fs::Permissions::from_mode(0o500)).unwrap();

    let result = undo.run();
    std::fs::set_permissions(&parent, std::fs::Permissions::from_mode(0o750)).unwrap();

    assert!(matches!(result, Err(Error::Rollback { .. })));
}

#[test]
fn test_directory_times_survive_best_effort_calls() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("stamped");
    std::fs::create_dir(&target).unwrap();

    let mtime = FileTime::from_unix_time(1_234_567_890, 0);
    metadata::set_times(&target, mtime, mtime).or_log();
    metadata::set_mode(&target, 0o755).or_log();

    let meta = std::fs::metadata(&target).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&meta), mtime);
}
