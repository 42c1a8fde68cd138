use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::bundle::helpers::default_true;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Enable the persistent cache layer
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Custom cache directory, defaults to `node_modules/.cache/bale`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
        }
    }
}
