//! Paths a transaction uses, derived deterministically from the target name.
//!
//! For a target `dir/name.ext`:
//! - lock directory `dir/~~<short_name>.!/`
//! - marker `dir/~~<short_name>.!/lock`
//! - temp output `dir/~~<short_name>.!/~~<local_temp_name>`
//! - backup `dir/~~bak--name.ext`

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::{Result, TransactError};
use crate::fs_ops::{local_temp_name, short_name};

pub const MARKER_NAME: &str = "lock";
pub const BACKUP_PREFIX: &str = "~~bak--";

static SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLayout {
    /// Parent directory of the target; everything else lives inside it.
    pub directory: PathBuf,
    pub lock_dir: PathBuf,
    pub marker: PathBuf,
    pub tmp: PathBuf,
    pub backup: PathBuf,
    lock_name: String,
}

impl LockLayout {
    pub fn for_target(target: &Path) -> Result<Self> {
        let name = target
            .file_name()
            .ok_or_else(|| TransactError::InvalidTarget(target.to_path_buf()))?;
        let directory = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let lock_name = format!("~~{}.!", short_name(name));
        let lock_dir = directory.join(&lock_name);

        let mut tmp_name = OsString::from("~~");
        tmp_name.push(local_temp_name(name));
        let mut backup_name = OsString::from(BACKUP_PREFIX);
        backup_name.push(name);

        Ok(Self {
            marker: lock_dir.join(MARKER_NAME),
            tmp: lock_dir.join(tmp_name),
            backup: directory.join(backup_name),
            lock_dir,
            directory,
            lock_name,
        })
    }

    /// File name of the lock directory, `~~<short_name>.!`.
    pub(crate) fn lock_name(&self) -> &str {
        &self.lock_name
    }

    /// Unique sibling of the lock directory, used for staging a new lock and
    /// for moving an old one aside before deletion.
    /// Pattern: `~~<short_name>.!.<pid>.<seq>.<tag>`
    pub(crate) fn sibling(&self, tag: &str) -> PathBuf {
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        self.directory
            .join(format!("{}.{}.{}.{}", self.lock_name, std::process::id(), seq, tag))
    }
}
