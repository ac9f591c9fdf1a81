//! Windows implementations of platform helpers.
//!
//! Notes:
//! - The lock marker is opened with share mode 0: while the holder keeps it
//!   open nobody else can open or delete it, and the handle dies with the
//!   process.
//! - Hidden/read-only are file attributes set through `SetFileAttributesW`.

use std::fs::{File, Metadata, OpenOptions};
use std::io;
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::fs::OpenOptionsExt;
use std::path::Path;

use windows_sys::Win32::Storage::FileSystem::{
    GetFileAttributesW, SetFileAttributesW, FILE_ATTRIBUTE_HIDDEN, FILE_ATTRIBUTE_NORMAL,
    FILE_ATTRIBUTE_READONLY, INVALID_FILE_ATTRIBUTES,
};

use super::MarkerProbe;

const ERROR_SHARING_VIOLATION: i32 = 32;

fn wide(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(once(0)).collect()
}

fn update_attributes(path: &Path, f: impl FnOnce(u32) -> u32) -> io::Result<()> {
    let w = wide(path);
    let current = unsafe { GetFileAttributesW(w.as_ptr()) };
    if current == INVALID_FILE_ATTRIBUTES {
        return Err(io::Error::last_os_error());
    }
    let mut next = f(current);
    if next == 0 {
        next = FILE_ATTRIBUTE_NORMAL;
    }
    if unsafe { SetFileAttributesW(w.as_ptr(), next) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn hide_path(path: &Path) -> io::Result<()> {
    update_attributes(path, |a| a | FILE_ATTRIBUTE_HIDDEN)
}

pub fn unhide_path(path: &Path) -> io::Result<()> {
    update_attributes(path, |a| a & !FILE_ATTRIBUTE_HIDDEN)
}

pub(crate) fn create_marker(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .share_mode(0)
        .open(path)
}

pub(crate) fn probe_marker(path: &Path) -> io::Result<MarkerProbe> {
    match OpenOptions::new().read(true).share_mode(0).open(path) {
        Ok(f) => Ok(MarkerProbe::Abandoned(f)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(MarkerProbe::Missing),
        Err(e) if e.raw_os_error() == Some(ERROR_SHARING_VIOLATION) => Ok(MarkerProbe::Held),
        Err(e) => Err(e),
    }
}

/// An exclusively opened marker cannot be swapped out under its holder.
pub(crate) fn same_file(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}

/// Clear the read-only attribute, which blocks deletion on Windows.
pub(crate) fn make_writable(path: &Path, meta: &Metadata) -> io::Result<()> {
    if !meta.permissions().readonly() {
        return Ok(());
    }
    update_attributes(path, |a| a & !FILE_ATTRIBUTE_READONLY)
}
