//! Filesystem helpers.

pub mod atomic;
pub mod dirs;
pub mod formats;

pub use atomic::atomic_write;
pub use dirs::{
    copy_dir, copy_dir_filtered, ensure_dir, is_executable, is_permission_denied,
    make_executable, make_writable, remove_dir_all, remove_file_if_exists,
};
pub use formats::{read_json_file, write_json_file};
