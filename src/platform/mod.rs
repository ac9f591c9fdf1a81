//! Platform-specific helpers.
//! Hides OS differences (Unix/Windows) behind a uniform API: the hidden
//! attribute, the lock marker's liveness signal, and write permission repair
//! before deletion.

use std::fs::File;

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{hide_path, unhide_path};
#[cfg(unix)]
pub(crate) use unix::{create_marker, make_writable, probe_marker, same_file};

#[cfg(not(unix))]
pub use windows::{hide_path, unhide_path};
#[cfg(not(unix))]
pub(crate) use windows::{create_marker, make_writable, probe_marker, same_file};

/// State of an existing lock marker as seen by a would-be owner.
#[derive(Debug)]
pub(crate) enum MarkerProbe {
    /// No marker file in the lock directory.
    Missing,
    /// Some live handle still holds the marker.
    Held,
    /// Nobody holds it; the returned handle now does.
    Abandoned(File),
}
