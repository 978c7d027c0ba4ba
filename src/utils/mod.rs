//! Shared utilities.
//!
//! - [`fs`] - File system operations with atomic writes and sorted walks

pub mod fs;

pub use fs::{atomic_write, atomic_write_string, ensure_dir, walk_files};
