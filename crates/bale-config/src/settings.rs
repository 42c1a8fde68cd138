//! Global configuration settings shared across profiles.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Log level for the bale crates (`error` through `trace`). Verbosity
    /// flags and `RUST_LOG` take precedence.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Worker count used when `bundle.worker_count` is unset
    #[serde(default)]
    pub parallel_jobs: Option<usize>,
}
