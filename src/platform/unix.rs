//! Unix implementations of platform helpers.
//!
//! The lock marker carries an exclusive `flock`. The kernel drops it when the
//! holder's descriptor closes, including on crash, so a marker we can lock
//! belongs to nobody.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use super::MarkerProbe;

/// No hidden attribute on Unix; dot-prefixed names are the convention and
/// lock artifacts use `~~` instead.
pub fn hide_path(_path: &Path) -> io::Result<()> {
    Ok(())
}

pub fn unhide_path(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn try_flock(f: &File) -> io::Result<bool> {
    let rc = unsafe { libc::flock(f.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return Ok(false);
    }
    Err(err)
}

/// Create a fresh marker (0600) and lock it.
pub(crate) fn create_marker(path: &Path) -> io::Result<File> {
    let f = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .custom_flags(libc::O_CLOEXEC)
        .mode(0o600)
        .open(path)?;
    if !try_flock(&f)? {
        return Err(io::Error::new(
            io::ErrorKind::WouldBlock,
            "freshly created lock marker is already locked",
        ));
    }
    Ok(f)
}

pub(crate) fn probe_marker(path: &Path) -> io::Result<MarkerProbe> {
    let f = match OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_CLOEXEC)
        .open(path)
    {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(MarkerProbe::Missing),
        Err(e) => return Err(e),
    };
    if try_flock(&f)? {
        Ok(MarkerProbe::Abandoned(f))
    } else {
        Ok(MarkerProbe::Held)
    }
}

/// True if `path` still names the inode behind `file`.
pub(crate) fn same_file(file: &File, path: &Path) -> io::Result<bool> {
    let held = file.metadata()?;
    let named = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    Ok(held.dev() == named.dev() && held.ino() == named.ino())
}

/// Give the owner full access to a directory so its entries can be unlinked.
/// Unlinking a file only needs write access on its parent, so files are left alone.
pub(crate) fn make_writable(path: &Path, meta: &Metadata) -> io::Result<()> {
    if !meta.is_dir() {
        return Ok(());
    }
    let mode = meta.permissions().mode();
    if mode & 0o700 == 0o700 {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o700))
}
