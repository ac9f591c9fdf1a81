use filetime::FileTime;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

/// True if `path` exists and has nonzero size.
pub fn file_is_ok(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Create `path` and any missing parents. Existing directories are fine.
pub fn create_dir(path: &Path) -> io::Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)
}

pub(crate) fn modified_time(meta: &Metadata) -> FileTime {
    FileTime::from_last_modification_time(meta)
}

/// Best available "creation" time: birth time where the platform reports it,
/// otherwise the Unix status-change time, otherwise the modification time.
pub(crate) fn creation_time(meta: &Metadata) -> FileTime {
    if let Some(t) = FileTime::from_creation_time(meta) {
        return t;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        FileTime::from_unix_time(meta.ctime(), meta.ctime_nsec() as u32)
    }
    #[cfg(not(unix))]
    {
        modified_time(meta)
    }
}

#[cfg(unix)]
pub(crate) fn fsync_dir(dir: &Path) -> io::Result<()> {
    let f = fs::File::open(dir)?;
    f.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
