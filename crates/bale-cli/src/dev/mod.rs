//! Dev mode plumbing: the file watcher that feeds a bundler session.

mod watcher;

pub use watcher::{FileWatcher, should_ignore};
