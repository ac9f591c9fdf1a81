//! Typed error definitions for atomic_transform.
//! One variant per failure mode a caller of a transaction may want to react to.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fs_ops::describe_io_error;

#[derive(Debug, Error)]
pub enum TransactError {
    /// Another live transaction owns the lock directory of this target.
    #[error("Target \"{}\" locked (lock directory {})", target.display(), lock_dir.display())]
    Locked { target: PathBuf, lock_dir: PathBuf },

    /// The caller's transformation returned an error.
    #[error("Transformation of \"{}\" into \"{}\" failed", source_path.display(), target.display())]
    Transformation {
        target: PathBuf,
        source_path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Directory creation, rename, removal or open failed.
    #[error("{message}")]
    Filesystem {
        message: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Target path has no file name: {0}")]
    InvalidTarget(PathBuf),
}

pub type Result<T, E = TransactError> = std::result::Result<T, E>;

impl TransactError {
    /// Adapter for `.map_err(...)`: wraps an io::Error with the operation,
    /// the path and a platform-aware hint.
    pub fn io<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |e: io::Error| Self::Filesystem {
            message: describe_io_error(op, path, &e),
            path: path.to_path_buf(),
            source: e,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// Kind of the underlying io::Error, for filesystem failures.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Filesystem { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_message_names_target() {
        let e = TransactError::Locked {
            target: PathBuf::from("out/a.json"),
            lock_dir: PathBuf::from("out/~~a.json-0123456789abcdef-json.!"),
        };
        let msg = e.to_string();
        assert!(msg.contains("a.json\" locked"), "msg was: {msg}");
        assert!(e.is_locked());
        assert_eq!(e.io_kind(), None);
    }

    #[test]
    fn io_adapter_keeps_kind_and_path() {
        let p = Path::new("/nonexistent/dir");
        let e = TransactError::io("create dir", p)(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(e.io_kind(), Some(io::ErrorKind::NotFound));
        let msg = e.to_string();
        assert!(msg.contains("create dir"));
        assert!(msg.contains("/nonexistent/dir"));
        assert!(!e.is_locked());
    }

    #[test]
    fn transformation_error_exposes_cause() {
        use std::error::Error as _;
        let e = TransactError::Transformation {
            target: PathBuf::from("a.json"),
            source_path: PathBuf::from("a.csv"),
            source: anyhow::anyhow!("bad row 3"),
        };
        let cause = e.source().map(|s| s.to_string()).unwrap_or_default();
        assert_eq!(cause, "bad row 3");
    }
}
