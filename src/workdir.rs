//! Running code against a particular working directory.
//!
//! Prefer [`with_work_dir`]: the action receives a [`WorkDir`] and resolves
//! paths or spawns commands relative to it, leaving the process untouched.
//! [`in_dir`] exists for APIs that only look at the real process cwd; it
//! changes it under a process-wide mutex and always changes it back.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};
use tracing::error;

static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Restores the saved cwd when dropped, including during unwinding.
struct CwdGuard {
    previous: PathBuf,
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            error!(dir = %self.previous.display(), error = %e, "failed to restore working directory");
        }
    }
}

/// Run `action` with the process working directory set to `dir`.
pub fn in_dir<T, F>(dir: &Path, action: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    // A panic in an earlier action poisons the mutex; the guard already
    // restored the cwd, so the lock is still usable.
    let _serial = CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    let previous = env::current_dir().context("read current working directory")?;
    env::set_current_dir(dir)
        .with_context(|| format!("change working directory to '{}'", dir.display()))?;
    let _restore = CwdGuard { previous };

    action().inspect_err(|e| {
        error!(dir = %dir.display(), error = %format!("{e:#}"), "action failed in working directory");
    })
}

/// An explicit working directory handed to an action instead of the process cwd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `rel` joined onto the working directory; absolute paths pass through.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// A `Command` for `program` that will run inside the working directory.
    pub fn command(&self, program: impl AsRef<std::ffi::OsStr>) -> Command {
        let mut cmd = Command::new(program);
        cmd.current_dir(&self.root);
        cmd
    }
}

/// Run `action` against `dir` without touching the process cwd.
pub fn with_work_dir<T, F>(dir: &Path, action: F) -> Result<T>
where
    F: FnOnce(&WorkDir) -> Result<T>,
{
    let wd = WorkDir::new(dir);
    action(&wd).inspect_err(|e| {
        error!(dir = %dir.display(), error = %format!("{e:#}"), "action failed in working directory");
    })
}
