//! Lookup helpers: case-insensitive search and creation-time ordering.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::util::{creation_time, modified_time};

/// Walk `root` and return the first file or directory named `name`,
/// compared case-insensitively. Returns the entry's actual path.
pub fn search_file(name: &str, root: &Path) -> Option<PathBuf> {
    let wanted = name.to_lowercase();
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_name().to_string_lossy().to_lowercase() == wanted)
        .map(|e| e.into_path())
}

fn millis(t: filetime::FileTime) -> i128 {
    i128::from(t.unix_seconds()) * 1000 + i128::from(t.nanoseconds() / 1_000_000)
}

/// Order two files by creation time (millisecond precision), falling back to
/// modification time on a tie. `Equal` if either file is missing.
pub fn compare_by_creation_time(a: &Path, b: &Path) -> Ordering {
    let (Ok(ma), Ok(mb)) = (fs::metadata(a), fs::metadata(b)) else {
        return Ordering::Equal;
    };
    millis(creation_time(&ma))
        .cmp(&millis(creation_time(&mb)))
        .then_with(|| millis(modified_time(&ma)).cmp(&millis(modified_time(&mb))))
}
