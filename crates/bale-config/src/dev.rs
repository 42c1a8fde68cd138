//! Development session configuration types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Enable module replacement. When false every change requests a full reload.
    #[serde(default = "default_true")]
    pub hot: bool,

    #[serde(default)]
    pub watch_paths: Vec<PathBuf>,

    /// Path fragments ignored by the file watcher
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Acceptor declarations: importer path -> dependency specifiers it accepts
    ///
    /// Declarations found in sources (`module.hot.accept("./dep")`) are added
    /// to these at session start.
    #[serde(default)]
    pub acceptors: IndexMap<PathBuf, Vec<String>>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            hot: true,
            watch_paths: Vec::new(),
            ignore: default_ignore(),
            debounce_ms: default_debounce_ms(),
            acceptors: IndexMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ignore() -> Vec<String> {
    vec!["node_modules".into(), "dist".into(), ".git".into()]
}

fn default_debounce_ms() -> u64 {
    100
}
