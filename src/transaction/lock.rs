//! Per-target lock directory.
//!
//! Design:
//! - The lock is the directory `~~<short>.!` next to the target. Whoever makes
//!   it appear first owns the target until the guard is released or dropped.
//! - Unix: the directory is assembled under a private staging name with the
//!   marker already created and `flock`ed, then published with one `rename`.
//!   Renaming onto an existing, non-empty directory fails, so publication is
//!   atomic and exclusive.
//! - Windows: `create_dir` on the lock path (fails if it exists), then the
//!   marker is opened with share mode 0.
//! - A lock path that is already taken is probed once. A marker nobody holds
//!   (crashed owner) is evicted and publication is retried once; anything else
//!   is `TransactError::Locked`. There is no waiting or polling. An occupant
//!   that cannot be probed at all (e.g. a plain file) is force-removed.
//! - Once acquired, old staging/grave siblings left by crashed callers are swept.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, trace, warn};

use super::layout::{LockLayout, MARKER_NAME};
use crate::config::Config;
use crate::errors::{Result, TransactError};
use crate::fs_ops::{hide_path, remove_path};
use crate::platform::{self, MarkerProbe};

/// RAII guard held while a transaction owns its target.
/// Dropping it removes the lock directory, including any leftover temp output.
#[derive(Debug)]
pub struct TargetLock {
    layout: LockLayout,
    marker: Option<File>,
    released: bool,
}

/// Minimum age of a staging/grave sibling before it counts as a crash leftover.
const SIBLING_GRACE: Duration = Duration::from_secs(60);

fn is_contention(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::AlreadyExists | io::ErrorKind::DirectoryNotEmpty
    )
}

impl TargetLock {
    /// Single-attempt acquisition of the lock for `target`.
    pub fn acquire(target: &Path, layout: &LockLayout, config: &Config) -> Result<Self> {
        let start = Instant::now();

        let lock = match publish(layout)? {
            Some(lock) => lock,
            None => {
                let retried = if evict(layout) { publish(layout)? } else { None };
                match retried {
                    Some(lock) => lock,
                    None => {
                        warn!(target = %target.display(), lock_dir = %layout.lock_dir.display(), "target locked by another transaction");
                        return Err(TransactError::Locked {
                            target: target.to_path_buf(),
                            lock_dir: layout.lock_dir.clone(),
                        });
                    }
                }
            }
        };

        if config.hide_artifacts {
            let _ = hide_path(&layout.lock_dir);
        }
        sweep_siblings(layout);
        trace!(
            lock_dir = %layout.lock_dir.display(),
            waited_us = start.elapsed().as_micros() as u64,
            "lock acquired"
        );
        Ok(lock)
    }

    pub fn lock_dir(&self) -> &Path {
        &self.layout.lock_dir
    }

    /// Where the transformation writes its output while the lock is held.
    pub fn tmp_path(&self) -> &Path {
        &self.layout.tmp
    }

    /// Release now and report failures; `Drop` does the same but only logs.
    pub fn release(mut self) -> io::Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let grave = self.layout.sibling("old");
        // Windows refuses to rename a directory with open handles inside.
        #[cfg(not(unix))]
        drop(self.marker.take());
        // Unix keeps the flock until the lock path is free again, so nobody can
        // mistake this lock for an abandoned one while it is being removed.
        let moved = fs::rename(&self.layout.lock_dir, &grave);
        drop(self.marker.take());

        match moved {
            Ok(()) => remove_path(&grave),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(lock_dir = %self.layout.lock_dir.display(), "lock directory vanished before release");
                Ok(())
            }
            Err(e) => {
                debug!(lock_dir = %self.layout.lock_dir.display(), error = %e, "cannot move lock aside; removing in place");
                remove_path(&self.layout.lock_dir)
            }
        }
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            warn!(lock_dir = %self.layout.lock_dir.display(), error = %e, "failed to remove lock directory");
        }
    }
}

/// Make a complete lock directory appear at the lock path.
/// `Ok(None)` means the path is already taken.
#[cfg(unix)]
fn publish(layout: &LockLayout) -> Result<Option<TargetLock>> {
    let staging = layout.sibling("new");
    fs::create_dir(&staging).map_err(TransactError::io("create lock staging directory", &staging))?;

    let marker_path = staging.join(MARKER_NAME);
    let marker = match platform::create_marker(&marker_path) {
        Ok(f) => f,
        Err(e) => {
            let _ = remove_path(&staging);
            return Err(TransactError::io("create lock marker", &marker_path)(e));
        }
    };

    match fs::rename(&staging, &layout.lock_dir) {
        Ok(()) => Ok(Some(TargetLock {
            layout: layout.clone(),
            marker: Some(marker),
            released: false,
        })),
        Err(e) => {
            drop(marker);
            let _ = remove_path(&staging);
            if is_contention(&e) || layout.lock_dir.exists() {
                debug!(lock_dir = %layout.lock_dir.display(), "lock path already taken");
                Ok(None)
            } else {
                Err(TransactError::io("publish lock directory", &layout.lock_dir)(e))
            }
        }
    }
}

#[cfg(not(unix))]
fn publish(layout: &LockLayout) -> Result<Option<TargetLock>> {
    match fs::create_dir(&layout.lock_dir) {
        Ok(()) => {}
        Err(e) if is_contention(&e) => {
            debug!(lock_dir = %layout.lock_dir.display(), "lock path already taken");
            return Ok(None);
        }
        Err(e) => return Err(TransactError::io("create lock directory", &layout.lock_dir)(e)),
    }
    match platform::create_marker(&layout.marker) {
        Ok(marker) => Ok(Some(TargetLock {
            layout: layout.clone(),
            marker: Some(marker),
            released: false,
        })),
        // Another caller evicted our fresh directory and published its own.
        Err(e) if is_contention(&e) || e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            let _ = fs::remove_dir(&layout.lock_dir);
            Err(TransactError::io("create lock marker", &layout.marker)(e))
        }
    }
}

/// Clear an abandoned lock. `false` means it is still in use or could not be
/// removed; either way the caller reports `Locked`.
fn evict(layout: &LockLayout) -> bool {
    let probe = match platform::probe_marker(&layout.marker) {
        Ok(probe) => probe,
        // A stray file at the lock path (ENOTDIR) or an unreadable marker.
        Err(e) => {
            warn!(lock_dir = %layout.lock_dir.display(), error = %e, "cannot probe lock marker; evicting occupant");
            return discard(layout, true);
        }
    };
    match probe {
        MarkerProbe::Held => false,
        MarkerProbe::Abandoned(handle) => {
            // The marker may have been replaced between open and lock.
            if !matches!(platform::same_file(&handle, &layout.marker), Ok(true)) {
                return false;
            }
            warn!(lock_dir = %layout.lock_dir.display(), "evicting abandoned lock");
            #[cfg(not(unix))]
            drop(handle);
            let evicted = discard(layout, false);
            #[cfg(unix)]
            drop(handle);
            evicted
        }
        MarkerProbe::Missing => {
            warn!(lock_dir = %layout.lock_dir.display(), "evicting lock directory without marker");
            discard(layout, true)
        }
    }
}

/// Move the lock path's occupant aside and delete it.
fn discard(layout: &LockLayout, was_markerless: bool) -> bool {
    let grave = layout.sibling("old");
    match fs::rename(&layout.lock_dir, &grave) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
        Err(e) => {
            debug!(lock_dir = %layout.lock_dir.display(), error = %e, "cannot move lock directory aside");
            return false;
        }
    }

    // A live lock may have been published between the probe and the rename.
    if was_markerless
        && matches!(
            platform::probe_marker(&grave.join(MARKER_NAME)),
            Ok(MarkerProbe::Held)
        )
    {
        let _ = fs::rename(&grave, &layout.lock_dir);
        return false;
    }

    if let Err(e) = remove_path(&grave) {
        warn!(path = %grave.display(), error = %e, "failed to delete evicted lock directory");
    }
    true
}

/// Remove staging (`.new`) and grave (`.old`) siblings that a crashed
/// acquisition or release left behind. Entries whose marker is still held or
/// that are younger than `SIBLING_GRACE` may belong to a live caller and stay.
fn sweep_siblings(layout: &LockLayout) {
    let Ok(entries) = fs::read_dir(&layout.directory) else {
        return;
    };
    let prefix = format!("{}.", layout.lock_name());
    let cutoff = SystemTime::now()
        .checked_sub(SIBLING_GRACE)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(&prefix) || !(name.ends_with(".new") || name.ends_with(".old")) {
            continue;
        }
        let recent = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|t| t > cutoff)
            .unwrap_or(true);
        if recent {
            continue;
        }
        let path = entry.path();
        if matches!(
            platform::probe_marker(&path.join(MARKER_NAME)),
            Ok(MarkerProbe::Held)
        ) {
            continue;
        }
        debug!(path = %path.display(), "removing leftover lock sibling");
        if let Err(e) = remove_path(&path) {
            debug!(path = %path.display(), error = %e, "failed to remove leftover lock sibling");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn layout_in(dir: &Path) -> LockLayout {
        LockLayout::for_target(&dir.join("a.json")).unwrap()
    }

    #[test]
    fn acquire_creates_marker_and_release_removes_dir() {
        let td = tempdir().unwrap();
        let layout = layout_in(td.path());
        let lock = TargetLock::acquire(&td.path().join("a.json"), &layout, &Config::default()).unwrap();
        assert!(layout.lock_dir.is_dir());
        assert!(layout.marker.is_file());
        assert_eq!(lock.tmp_path(), layout.tmp.as_path());
        lock.release().unwrap();
        assert!(!layout.lock_dir.exists());
        // Nothing but the (absent) target's directory contents remain.
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 0);
    }

    #[test]
    fn second_acquire_is_locked() {
        let td = tempdir().unwrap();
        let target = td.path().join("a.json");
        let layout = layout_in(td.path());
        let first = TargetLock::acquire(&target, &layout, &Config::default()).unwrap();
        let err = TargetLock::acquire(&target, &layout, &Config::default()).unwrap_err();
        assert!(err.is_locked());
        assert!(layout.marker.is_file(), "live lock must survive a failed attempt");
        drop(first);
        let third = TargetLock::acquire(&target, &layout, &Config::default());
        assert!(third.is_ok());
    }

    #[test]
    fn abandoned_lock_is_evicted() {
        let td = tempdir().unwrap();
        let layout = layout_in(td.path());
        fs::create_dir(&layout.lock_dir).unwrap();
        fs::write(&layout.marker, b"").unwrap();
        fs::write(&layout.tmp, b"half-written").unwrap();

        let lock = TargetLock::acquire(&td.path().join("a.json"), &layout, &Config::default()).unwrap();
        assert!(!layout.tmp.exists(), "stale temp output must be gone");
        drop(lock);
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 0);
    }

    #[test]
    fn markerless_lock_dir_is_evicted() {
        let td = tempdir().unwrap();
        let layout = layout_in(td.path());
        fs::create_dir(&layout.lock_dir).unwrap();
        fs::write(layout.lock_dir.join("junk"), b"x").unwrap();
        let lock = TargetLock::acquire(&td.path().join("a.json"), &layout, &Config::default());
        assert!(lock.is_ok());
    }

    #[test]
    fn stray_file_at_lock_path_is_evicted() {
        let td = tempdir().unwrap();
        let layout = layout_in(td.path());
        fs::write(&layout.lock_dir, b"stray").unwrap();
        let lock = TargetLock::acquire(&td.path().join("a.json"), &layout, &Config::default()).unwrap();
        assert!(layout.lock_dir.is_dir());
        drop(lock);
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 0);
    }

    #[test]
    fn old_abandoned_siblings_are_swept() {
        use filetime::{set_file_mtime, FileTime};
        let td = tempdir().unwrap();
        let layout = layout_in(td.path());
        let long_ago = FileTime::from_unix_time(1_600_000_000, 0);

        let staging = td.path().join(format!("{}.99999.0.new", layout.lock_name()));
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join(MARKER_NAME), b"").unwrap();
        set_file_mtime(&staging, long_ago).unwrap();

        let grave = td.path().join(format!("{}.99999.1.old", layout.lock_name()));
        fs::create_dir(&grave).unwrap();
        fs::write(grave.join("~~a.json"), b"half").unwrap();
        set_file_mtime(&grave, long_ago).unwrap();

        // Held by a live publisher: kept even though old.
        let busy = td.path().join(format!("{}.99999.2.new", layout.lock_name()));
        fs::create_dir(&busy).unwrap();
        let _held = platform::create_marker(&busy.join(MARKER_NAME)).unwrap();
        set_file_mtime(&busy, long_ago).unwrap();

        // Young and unheld: may be mid-publication, kept.
        let young = td.path().join(format!("{}.99999.3.new", layout.lock_name()));
        fs::create_dir(&young).unwrap();

        // Same suffix, different lock: not ours.
        let other = td.path().join("~~unrelated.!.99999.4.old");
        fs::create_dir(&other).unwrap();
        set_file_mtime(&other, long_ago).unwrap();

        let lock = TargetLock::acquire(&td.path().join("a.json"), &layout, &Config::default()).unwrap();
        assert!(!staging.exists());
        assert!(!grave.exists());
        assert!(busy.exists());
        assert!(young.exists());
        assert!(other.exists());
        drop(lock);
    }
}
