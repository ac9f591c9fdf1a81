//! Failure paths: errors, panics, declined output, contention, crash leftovers.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use atomic_transform::transaction::TargetLock;
use atomic_transform::{transact, Config, LockLayout, Outcome, TransactError};
use filetime::{set_file_mtime, FileTime};
use tempfile::tempdir;

/// `dir/a.csv` newer than an existing `dir/a.json` holding "old".
fn stale_pair(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let source = dir.join("a.csv");
    let target = dir.join("a.json");
    fs::write(&source, "new").unwrap();
    fs::write(&target, "old").unwrap();
    set_file_mtime(&target, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
    set_file_mtime(&source, FileTime::from_unix_time(1_600_000_100, 0)).unwrap();
    (source, target)
}

#[test]
fn failing_transformation_leaves_target_and_no_lock() {
    let td = tempdir().unwrap();
    let (source, target) = stale_pair(td.path());
    let layout = LockLayout::for_target(&target).unwrap();

    let err = transact(&target, &source, |tmp, _| {
        fs::write(tmp, "partial")?;
        anyhow::bail!("parse error on line 3")
    })
    .unwrap_err();

    match &err {
        TransactError::Transformation { target: t, source_path, source: cause } => {
            assert_eq!(t, &target);
            assert_eq!(source_path, &source);
            assert_eq!(cause.to_string(), "parse error on line 3");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    assert!(!layout.lock_dir.exists());
    assert!(!layout.backup.exists());
}

#[test]
fn panicking_transformation_releases_lock() {
    let td = tempdir().unwrap();
    let (source, target) = stale_pair(td.path());
    let layout = LockLayout::for_target(&target).unwrap();

    let res = panic::catch_unwind(AssertUnwindSafe(|| {
        transact(&target, &source, |tmp, _| {
            fs::write(tmp, "half").unwrap();
            panic!("transformation crashed");
        })
    }));
    assert!(res.is_err());
    assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    assert!(!layout.lock_dir.exists(), "guard must clean up during unwind");

    // The next caller proceeds normally.
    let outcome = transact(&target, &source, |tmp, src| {
        fs::copy(src, tmp)?;
        Ok(true)
    })
    .unwrap();
    assert!(outcome.is_committed());
    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
}

#[test]
fn declined_or_empty_output_is_discarded() {
    let td = tempdir().unwrap();
    let (source, target) = stale_pair(td.path());
    let layout = LockLayout::for_target(&target).unwrap();

    let declined = transact(&target, &source, |tmp, _| {
        fs::write(tmp, "ignored")?;
        Ok(false)
    })
    .unwrap();
    assert_eq!(declined, Outcome::Discarded);

    let empty = transact(&target, &source, |tmp, _| {
        fs::write(tmp, "")?;
        Ok(true)
    })
    .unwrap();
    assert_eq!(empty, Outcome::Discarded);

    let nothing = transact(&target, &source, |_, _| Ok(true)).unwrap();
    assert_eq!(nothing, Outcome::Discarded);

    assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    assert!(!layout.lock_dir.exists());
    assert!(!layout.backup.exists());
}

#[test]
fn live_lock_yields_locked() {
    let td = tempdir().unwrap();
    let (source, target) = stale_pair(td.path());
    let layout = LockLayout::for_target(&target).unwrap();
    let held = TargetLock::acquire(&target, &layout, &Config::default()).unwrap();

    let err = transact(&target, &source, |_, _| panic!("must not run while locked")).unwrap_err();
    assert!(err.is_locked(), "got {err:?}");
    assert!(err.to_string().contains("locked"));
    assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    assert!(layout.marker.is_file(), "the holder's lock must be left alone");

    drop(held);
    assert!(!layout.lock_dir.exists());
    let outcome = transact(&target, &source, |tmp, src| {
        fs::copy(src, tmp)?;
        Ok(true)
    })
    .unwrap();
    assert!(outcome.is_committed());
}

#[test]
fn abandoned_lock_directory_is_recovered() {
    let td = tempdir().unwrap();
    let (source, target) = stale_pair(td.path());
    let layout = LockLayout::for_target(&target).unwrap();

    // What a killed process leaves behind: marker nobody holds plus half output.
    fs::create_dir(&layout.lock_dir).unwrap();
    fs::write(&layout.marker, "").unwrap();
    fs::write(&layout.tmp, "trunc").unwrap();

    let outcome = transact(&target, &source, |tmp, src| {
        assert!(!tmp.exists(), "stale temp output must not leak into a new run");
        fs::copy(src, tmp)?;
        Ok(true)
    })
    .unwrap();
    assert!(outcome.is_committed());
    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    assert!(!layout.lock_dir.exists());

    let leftovers: Vec<_> = fs::read_dir(td.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("~~") && !n.starts_with("~~bak--"))
        .collect();
    assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");
}

#[test]
fn markerless_lock_directory_is_recovered() {
    let td = tempdir().unwrap();
    let (source, target) = stale_pair(td.path());
    let layout = LockLayout::for_target(&target).unwrap();
    fs::create_dir(&layout.lock_dir).unwrap();

    let outcome = transact(&target, &source, |tmp, src| {
        fs::copy(src, tmp)?;
        Ok(true)
    })
    .unwrap();
    assert!(outcome.is_committed());
    assert!(!layout.lock_dir.exists());
}

#[test]
fn target_without_file_name_is_rejected() {
    let td = tempdir().unwrap();
    let source = td.path().join("a.csv");
    fs::write(&source, "x").unwrap();
    let err = transact(Path::new(""), &source, |_, _| Ok(true)).unwrap_err();
    assert!(matches!(err, TransactError::InvalidTarget(_)));
}

#[test]
fn stray_file_at_lock_path_is_cleared() {
    let td = tempdir().unwrap();
    let (source, target) = stale_pair(td.path());
    let layout = LockLayout::for_target(&target).unwrap();
    fs::write(&layout.lock_dir, "stray").unwrap();

    let outcome = transact(&target, &source, |tmp, src| {
        fs::copy(src, tmp)?;
        Ok(true)
    })
    .unwrap();
    assert!(outcome.is_committed());
    assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    assert!(!layout.lock_dir.exists());
}

#[test]
fn crash_leftover_siblings_are_swept() {
    let td = tempdir().unwrap();
    let (source, target) = stale_pair(td.path());
    let layout = LockLayout::for_target(&target).unwrap();
    let lock_name = layout.lock_dir.file_name().unwrap().to_string_lossy().into_owned();
    let long_ago = FileTime::from_unix_time(1_600_000_000, 0);

    // A publisher killed before its rename, and a releaser killed mid-delete.
    let staging = td.path().join(format!("{lock_name}.99999.0.new"));
    fs::create_dir(&staging).unwrap();
    fs::write(staging.join("lock"), "").unwrap();
    set_file_mtime(&staging, long_ago).unwrap();
    let grave = td.path().join(format!("{lock_name}.99999.1.old"));
    fs::create_dir(&grave).unwrap();
    fs::write(grave.join("~~a.json"), "trunc").unwrap();
    set_file_mtime(&grave, long_ago).unwrap();

    let outcome = transact(&target, &source, |tmp, src| {
        fs::copy(src, tmp)?;
        Ok(true)
    })
    .unwrap();
    assert!(outcome.is_committed());

    let mut names: Vec<String> = fs::read_dir(td.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.csv", "a.json", "~~bak--a.json"]);
}
