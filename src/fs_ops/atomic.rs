//! Atomic rename-into-place.
//! - `fs::rename` replaces an existing destination on every supported platform
//!   (MoveFileExW with MOVEFILE_REPLACE_EXISTING on Windows), so readers see
//!   either the old file or the new one.
//! - Optionally fsyncs the destination directory so the rename survives a crash.

use std::fs;
use std::io;
use std::path::Path;

use super::util::fsync_dir;

/// Rename `src` onto `dst`, replacing `dst` if present.
pub fn replace_file(src: &Path, dst: &Path, sync_dir: bool) -> io::Result<()> {
    fs::rename(src, dst)?;
    if sync_dir
        && let Some(parent) = dst.parent()
        && !parent.as_os_str().is_empty()
    {
        // The rename already happened; a failed fsync must not undo that.
        let _ = fsync_dir(parent);
    }
    Ok(())
}
