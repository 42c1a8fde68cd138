//! Core bundle configuration types shared across bale crates.

mod cache;
mod filenames;
mod helpers;
mod html;
mod rules;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

pub use cache::CacheOptions;
pub use filenames::{FilenameTemplates, TemplatePart, parse_template};
pub use html::HtmlOptions;
pub use rules::{RuleGroupOptions, RuleOptions, RuleType, StepOptions, default_rules};

use helpers::{
    default_extensions, default_inline_limit, default_large_asset_bytes, default_output_dir,
    default_package_root, default_public_path, default_step_timeout_ms,
};

/// How modules reachable from several chunk roots are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Copy the module into every chunk that reaches it
    #[default]
    Duplicate,
    /// Move the module into a single common chunk
    Hoist,
}

/// What happens when an import cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Fail the build
    #[default]
    Strict,
    /// Drop the edge and record a diagnostic
    Tolerant,
}

/// Main bundle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleOptions {
    /// Entry points, relative to the project root
    #[serde(default)]
    pub entries: Vec<PathBuf>,

    /// Output directory for generated chunks and assets
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory bare specifiers are resolved against
    #[serde(default = "default_package_root")]
    pub package_root: PathBuf,

    /// Extensions tried, in order, for specifiers without one (no leading dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Path aliases for import resolution (e.g., "@js" → "src/js")
    ///
    /// Longest matching prefix wins.
    #[serde(default)]
    pub path_aliases: IndexMap<String, PathBuf>,

    /// External modules (left as runtime imports, never bundled)
    #[serde(default)]
    pub external: Vec<String>,

    /// Transform rule groups
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleGroupOptions>,

    /// Assets strictly smaller than this many bytes are inlined
    #[serde(default = "default_inline_limit")]
    pub inline_limit: u64,

    /// Modules at or above this size skip text transforms
    #[serde(default = "default_large_asset_bytes")]
    pub large_asset_bytes: u64,

    #[serde(default)]
    pub filenames: FilenameTemplates,

    /// Prefix for URLs written into emitted code (e.g. `url(...)` targets)
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Emit an HTML page referencing the entry chunks
    #[serde(default)]
    pub html: Option<HtmlOptions>,

    #[serde(default)]
    pub split_strategy: SplitStrategy,

    #[serde(default)]
    pub unresolved: UnresolvedPolicy,

    /// Emit stylesheets as separate files instead of injecting them
    #[serde(default)]
    pub extract_styles: bool,

    #[serde(default)]
    pub source_maps: bool,

    /// Append a minify step to script and style chains
    #[serde(default)]
    pub minify: bool,

    /// Empty the output directory before writing
    #[serde(default)]
    pub clean: bool,

    /// Transform workers, defaults to available parallelism
    #[serde(default)]
    pub worker_count: Option<usize>,

    /// Per-step timeout, `None` disables it
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: Option<u64>,

    #[serde(default)]
    pub cache: CacheOptions,
}

impl BundleOptions {
    /// Create from serde_json::Value (for programmatic config)
    ///
    /// # Example
    ///
    /// ```
    /// use bale_config::BundleOptions;
    /// use serde_json::json;
    /// use std::path::PathBuf;
    ///
    /// let value = json!({
    ///     "entries": ["src/main.js"],
    ///     "minify": true
    /// });
    ///
    /// let options = BundleOptions::from_value(value).unwrap();
    /// assert_eq!(options.entries, vec![PathBuf::from("src/main.js")]);
    /// assert!(options.minify);
    /// ```
    pub fn from_value(value: Value) -> Result<Self, crate::error::ConfigError> {
        serde_json::from_value(value).map_err(|e| crate::error::ConfigError::InvalidValue {
            field: "bundle".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> Result<Value, crate::error::ConfigError> {
        serde_json::to_value(self).map_err(|e| crate::error::ConfigError::InvalidValue {
            field: "bundle".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Add a path alias for import resolution
    ///
    /// # Example
    /// ```
    /// use bale_config::BundleOptions;
    ///
    /// let options = BundleOptions::default()
    ///     .with_alias("@js", "src/js")
    ///     .with_alias("@css", "src/css");
    /// assert_eq!(options.path_aliases.len(), 2);
    /// ```
    pub fn with_alias(mut self, alias: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.path_aliases.insert(alias.into(), path.into());
        self
    }

    pub fn with_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.entries.push(entry.into());
        self
    }

    /// Worker count with the default applied
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            entries: vec![],
            output_dir: default_output_dir(),
            package_root: default_package_root(),
            extensions: default_extensions(),
            path_aliases: IndexMap::new(),
            external: vec![],
            rules: default_rules(),
            inline_limit: default_inline_limit(),
            large_asset_bytes: default_large_asset_bytes(),
            filenames: FilenameTemplates::default(),
            public_path: default_public_path(),
            html: None,
            split_strategy: SplitStrategy::default(),
            unresolved: UnresolvedPolicy::default(),
            extract_styles: false,
            source_maps: false,
            minify: false,
            clean: false,
            worker_count: None,
            step_timeout_ms: default_step_timeout_ms(),
            cache: CacheOptions::default(),
        }
    }
}
