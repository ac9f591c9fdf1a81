//! Filesystem utility layer consumed by the transaction orchestrator.

mod atomic;
mod helpers;
mod names;
mod remove;
mod search;
mod util;

pub use atomic::replace_file;
pub use helpers::describe_io_error;
pub use names::{
    hash_bytes, hash_string, local_temp_name, short_name, short_name_ext, short_uniq_filename,
    short_uniq_filename_ext, transliterate, HASH_LEN,
};
pub use remove::{remove_path, remove_path_older_than, remove_paths};
pub use search::{compare_by_creation_time, search_file};
pub use util::{create_dir, file_is_ok};

pub(crate) use util::modified_time;

// Hidden-attribute toggling lives with the other platform hooks.
pub use crate::platform::{hide_path, unhide_path};
