//! Core library for `atomic_transform`.
//!
//! Regenerates a derived file (`target`) from its input (`source`) only when
//! the target is stale, through a caller-supplied transformation, so that:
//! - readers never see a half-written target (output is written to a temp file
//!   inside a per-target lock directory and renamed into place), and
//! - two callers never run the transformation for the same target at once
//!   (whoever publishes the lock directory first wins; the other gets
//!   `TransactError::Locked`).
//!
//! The previous target is kept as `~~bak--<name>` next to it.
//!
//! ```no_run
//! use std::fs;
//! use std::path::Path;
//! use atomic_transform::{transact, Outcome};
//!
//! let outcome = transact(Path::new("data/a.json"), Path::new("data/a.csv"), |tmp, src| {
//!     let csv = fs::read_to_string(src)?;
//!     fs::write(tmp, format!("{:?}", csv.lines().collect::<Vec<_>>()))?;
//!     Ok(true)
//! })?;
//! assert!(matches!(outcome, Outcome::Committed { .. } | Outcome::UpToDate));
//! # Ok::<(), atomic_transform::TransactError>(())
//! ```

pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod logging;
pub mod platform;
pub mod transaction;
pub mod workdir;

// Re-export commonly used types and functions for convenience
pub use config::{default_config_path, load_config, load_config_from_xml_path, Config, LogLevel};
pub use errors::{Result, TransactError};
pub use fs_ops::{
    compare_by_creation_time, create_dir, file_is_ok, hash_string, hide_path, remove_path,
    remove_path_older_than, remove_paths, search_file, short_name, short_uniq_filename,
    transliterate, unhide_path,
};
pub use logging::init_tracing;
pub use transaction::{
    needs_update, transact, transact_with_options, LockLayout, Outcome, Transaction,
};
pub use workdir::{in_dir, with_work_dir, WorkDir};
