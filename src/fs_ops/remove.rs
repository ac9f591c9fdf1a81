//! Removal of files and directory trees, tolerant of read-only entries.
//!
//! A first attempt uses plain `remove_dir_all`/`remove_file`. If that fails with
//! PermissionDenied, every entry of the tree is made writable and the removal is
//! retried exactly once. Any other error is returned unchanged.

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

use super::util::creation_time;
use crate::platform::make_writable;

fn remove_once(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Make `path` and everything below it writable, ignoring entries that vanish.
/// Only the tree itself is touched; its parent keeps whatever mode it had.
fn unlock_tree(path: &Path) {
    // Pre-order walk: a directory becomes writable before its children are
    // listed or unlinked.
    for entry in WalkDir::new(path).follow_links(false).into_iter() {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_symlink() {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            let _ = make_writable(entry.path(), &meta);
        }
    }
}

/// Remove a file or recursively remove a directory. Missing paths are fine.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let is_dir = meta.is_dir();
    match remove_once(path, is_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), error = %e, "removal denied; clearing read-only bits and retrying");
            unlock_tree(path);
            match remove_once(path, is_dir) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        }
        Err(e) => Err(e),
    }
}

/// Like [`remove_path`], but a plain file is only removed when it was created
/// before `cutoff`. Directories are always removed.
pub fn remove_path_older_than(path: &Path, cutoff: SystemTime) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !meta.is_dir() && creation_time(&meta) >= FileTime::from_system_time(cutoff) {
        return Ok(());
    }
    remove_path(path)
}

/// [`remove_path`] for each entry, stopping at the first error.
pub fn remove_paths<P: AsRef<Path>>(paths: &[P]) -> io::Result<()> {
    paths.iter().try_for_each(|p| remove_path(p.as_ref()))
}
