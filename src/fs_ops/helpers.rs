//! io::Error enrichment.
//!
//! Builds "<op> '<path>': <error> — <hint> [os code: N]" messages so a failed
//! transaction says what it was doing, where, and what usually causes it.

use std::io;
use std::path::Path;

/// Hint for a raw OS error code, if we have one.
fn hint_for_code(code: i32) -> Option<&'static str> {
    #[cfg(unix)]
    {
        let hint = match code {
            libc::EACCES | libc::EPERM => "permission denied; check ownership and write permissions",
            libc::EXDEV => "cross-filesystem; lock directory and target must share a filesystem",
            libc::EBUSY => "resource busy; another process is using it",
            libc::ENOENT => "path not found; verify it exists",
            libc::EEXIST | libc::ENOTEMPTY => "already exists; another transaction may own it",
            libc::ENOSPC => "insufficient space on device",
            libc::EROFS => "read-only filesystem; cannot write here",
            libc::ENAMETOOLONG => "filename or path too long; shorten path segments",
            libc::EMFILE | libc::ENFILE => "too many open files",
            _ => return None,
        };
        Some(hint)
    }
    #[cfg(windows)]
    {
        let hint = match code {
            5 => "access denied; check permissions or the read-only attribute", // ERROR_ACCESS_DENIED
            17 => "not same device; lock directory and target must share a volume", // ERROR_NOT_SAME_DEVICE
            32 => "sharing violation; the file is in use",                      // ERROR_SHARING_VIOLATION
            2 | 3 => "path not found; verify it exists",
            80 | 183 => "already exists; another transaction may own it",
            112 => "insufficient disk space",
            206 => "filename or path too long (MAX_PATH exceeded)",
            _ => return None,
        };
        Some(hint)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = code;
        None
    }
}

fn hint_for_kind(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::NotFound => Some("path not found; verify it exists"),
        io::ErrorKind::AlreadyExists => Some("already exists; another transaction may own it"),
        _ => None,
    }
}

/// Human-friendly description of a failed filesystem operation.
pub fn describe_io_error(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    match e.raw_os_error() {
        Some(code) => {
            if let Some(hint) = hint_for_code(code) {
                msg.push_str(" — ");
                msg.push_str(hint);
            }
            msg.push_str(&format!(" [os code: {code}]"));
        }
        None => {
            if let Some(hint) = hint_for_kind(e.kind()) {
                msg.push_str(" — ");
                msg.push_str(hint);
            }
        }
    }
    msg
}
