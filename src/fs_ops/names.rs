//! Short, ASCII-only, collision-resistant file names.
//!
//! Long or non-ASCII names break tools with path-length limits or poor Unicode
//! support. A short name keeps a transliterated head and tail of the original
//! (so it stays recognizable and keeps its extension) around a hash of the
//! whole name (so it stays unique). The result is deterministic: concurrent
//! callers for the same target derive the same lock path.

use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Hex digits kept from the digest.
pub const HASH_LEN: usize = 16;

/// Head/tail lengths (in chars) of the lock-directory form.
const SHORT_HEAD: usize = 8;
const SHORT_TAIL: usize = 4;
/// Head/tail lengths of the temp-file form; a long tail keeps the extension.
const EXT_HEAD: usize = 4;
const EXT_TAIL: usize = 64;

/// First 16 hex chars of the SHA-256 of `bytes`.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(HASH_LEN);
    for b in digest.iter().take(HASH_LEN / 2) {
        let _ = write!(hex, "{b:02x}");
    }
    hex
}

/// Stable 16-hex-char hash of a string.
pub fn hash_string(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Unicode → ASCII; anything still unsafe in a file name becomes `_`.
pub fn transliterate(s: &str) -> String {
    deunicode::deunicode_with_tofu(s, "_")
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' | '+' | '~' | '!' => c,
            _ => '_',
        })
        .collect()
}

fn head(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn tail(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    match s.char_indices().nth(count - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

fn compose(name: &OsStr, head_len: usize, tail_len: usize) -> String {
    let text = name.to_string_lossy();
    format!(
        "{}-{}-{}",
        transliterate(head(&text, head_len)),
        hash_bytes(name.as_encoded_bytes()),
        transliterate(tail(&text, tail_len))
    )
}

/// Very short form for lock directories: `head8-hash-tail4`.
pub fn short_name(name: &OsStr) -> String {
    compose(name, SHORT_HEAD, SHORT_TAIL)
}

/// Longer form for temp files: `head4-hash-tail64`.
pub fn short_name_ext(name: &OsStr) -> String {
    compose(name, EXT_HEAD, EXT_TAIL)
}

/// Temp-file name for `name`: the long short form, unless that is not
/// actually shorter than the original, in which case the original is kept.
pub fn local_temp_name(name: &OsStr) -> std::ffi::OsString {
    let shortened = short_name_ext(name);
    if shortened.chars().count() < name.to_string_lossy().chars().count() {
        shortened.into()
    } else {
        name.to_os_string()
    }
}

fn with_short_file_name(path: &Path, f: impl FnOnce(&OsStr) -> String) -> PathBuf {
    match path.file_name() {
        Some(name) => path.with_file_name(f(name)),
        None => path.to_path_buf(),
    }
}

/// `path` with its last component replaced by [`short_name`].
pub fn short_uniq_filename(path: &Path) -> PathBuf {
    with_short_file_name(path, short_name)
}

/// `path` with its last component replaced by [`short_name_ext`].
pub fn short_uniq_filename_ext(path: &Path) -> PathBuf {
    with_short_file_name(path, short_name_ext)
}
