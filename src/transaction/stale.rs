//! Staleness predicate: does `target` need to be regenerated from `source`?

use filetime::FileTime;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::fs_ops::modified_time;

/// True when `source` exists and `target` is missing, empty, or older than
/// `max(mtime(source), update_time)`. Reads metadata only.
pub fn needs_update(target: &Path, source: &Path, update_time: Option<SystemTime>) -> bool {
    let Ok(source_meta) = fs::metadata(source) else {
        return false;
    };
    let mut reference = modified_time(&source_meta);
    if let Some(t) = update_time {
        reference = reference.max(FileTime::from_system_time(t));
    }
    match fs::metadata(target) {
        Ok(meta) if meta.len() > 0 => modified_time(&meta) < reference,
        _ => true,
    }
}
