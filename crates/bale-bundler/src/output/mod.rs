//! Bundle output on disk.

pub mod writer;

pub use writer::{clean_dir, write_assets};
