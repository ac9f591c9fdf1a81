//! Lazy, lock-protected atomic regeneration of a target file from a source file.
//!
//! Flow: staleness check → lock layout → lock → transformation into the temp
//! path → backup old target and move the temp file into place → release.
//! The target is never observed half-written: the transformation only ever
//! sees a path inside the lock directory, and promotion is a rename.

mod layout;
mod lock;
mod stale;

pub use layout::{LockLayout, BACKUP_PREFIX, MARKER_NAME};
pub use lock::TargetLock;
pub use stale::needs_update;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{Result, TransactError};
use crate::fs_ops::{create_dir, file_is_ok, hide_path, replace_file, unhide_path};

/// What a transaction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Target was fresh; nothing ran and nothing was touched.
    UpToDate,
    /// New output was moved into place. `backup` is set when a previous
    /// target existed and was kept aside.
    Committed { backup: Option<PathBuf> },
    /// The transformation declined (returned `false`) or left no usable output.
    Discarded,
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Builder for one regeneration of `target` from `source`.
#[derive(Debug, Clone)]
pub struct Transaction<'a> {
    target: &'a Path,
    source: &'a Path,
    update_time: Option<SystemTime>,
    config: Config,
}

impl<'a> Transaction<'a> {
    pub fn new(target: &'a Path, source: &'a Path) -> Self {
        Self {
            target,
            source,
            update_time: None,
            config: Config::default(),
        }
    }

    /// Treat the target as stale if it is older than `t`, even when the
    /// source itself is older.
    pub fn update_time(mut self, t: SystemTime) -> Self {
        self.update_time = Some(t);
        self
    }

    pub fn config(mut self, config: &Config) -> Self {
        self.config = config.clone();
        self
    }

    /// Run with a two-argument transformation `(tmp, source)`.
    pub fn run<F>(self, transform: F) -> Result<Outcome>
    where
        F: FnOnce(&Path, &Path) -> anyhow::Result<bool>,
    {
        let Self {
            target,
            source,
            update_time,
            config,
        } = self;

        if !needs_update(target, source, update_time) {
            debug!(target = %target.display(), "target up to date");
            return Ok(Outcome::UpToDate);
        }

        let layout = LockLayout::for_target(target)?;
        create_dir(&layout.directory)
            .map_err(TransactError::io("create target directory", &layout.directory))?;

        // Dropping the guard on any early return (or unwind) removes the lock.
        let lock = TargetLock::acquire(target, &layout, &config)?;
        debug!(target = %target.display(), tmp = %layout.tmp.display(), "running transformation");

        let produced = transform(&layout.tmp, source).map_err(|e| TransactError::Transformation {
            target: target.to_path_buf(),
            source_path: source.to_path_buf(),
            source: e,
        })?;

        if !produced || !file_is_ok(&layout.tmp) {
            info!(
                target = %target.display(),
                reported_success = produced,
                "transformation produced no usable output; target left unchanged"
            );
            finish(lock);
            return Ok(Outcome::Discarded);
        }

        let backup = promote(target, &layout, &config)?;
        info!(
            target = %target.display(),
            source = %source.display(),
            backup = backup.as_ref().map(|b| b.display().to_string()).unwrap_or_default(),
            "target regenerated"
        );
        finish(lock);
        Ok(Outcome::Committed { backup })
    }

    /// Run with a three-argument transformation `(tmp, source, options)`;
    /// `options` is passed through untouched.
    pub fn run_with_options<O, F>(self, options: &O, transform: F) -> Result<Outcome>
    where
        O: ?Sized,
        F: FnOnce(&Path, &Path, &O) -> anyhow::Result<bool>,
    {
        self.run(|tmp, source| transform(tmp, source, options))
    }
}

/// Regenerate `target` from `source` with `transform(tmp, source)` when stale.
pub fn transact<F>(target: &Path, source: &Path, transform: F) -> Result<Outcome>
where
    F: FnOnce(&Path, &Path) -> anyhow::Result<bool>,
{
    Transaction::new(target, source).run(transform)
}

/// Like [`transact`], forwarding `options` as the transformation's third argument.
pub fn transact_with_options<O, F>(
    target: &Path,
    source: &Path,
    options: &O,
    transform: F,
) -> Result<Outcome>
where
    O: ?Sized,
    F: FnOnce(&Path, &Path, &O) -> anyhow::Result<bool>,
{
    Transaction::new(target, source).run_with_options(options, transform)
}

/// Back up the current target (if any) and move the temp output into place.
fn promote(target: &Path, layout: &LockLayout, config: &Config) -> Result<Option<PathBuf>> {
    let backup = if fs::symlink_metadata(target).is_ok() {
        // A hidden destination can make the replacing rename fail on Windows.
        if config.hide_artifacts && layout.backup.exists() {
            let _ = unhide_path(&layout.backup);
        }
        // One rename: the previous backup is replaced, never deleted first.
        replace_file(target, &layout.backup, false)
            .map_err(TransactError::io("back up previous target", target))?;
        if config.hide_artifacts {
            let _ = hide_path(&layout.backup);
        }
        Some(layout.backup.clone())
    } else {
        None
    };

    if let Err(e) = replace_file(&layout.tmp, target, config.sync_dir) {
        if backup.is_some() && fs::rename(&layout.backup, target).is_err() {
            warn!(target = %target.display(), backup = %layout.backup.display(), "could not restore previous target from backup");
        }
        return Err(TransactError::io("move output into place", target)(e));
    }
    Ok(backup)
}

fn finish(lock: TargetLock) {
    let lock_dir = lock.lock_dir().to_path_buf();
    if let Err(e) = lock.release() {
        warn!(lock_dir = %lock_dir.display(), error = %e, "failed to remove lock directory");
    }
}
