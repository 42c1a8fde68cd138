//! Pluggable config validation strategies
//!
//! Separates filesystem validation (for CLI use) from schema validation (for library use).

use std::path::Path;

use regex::Regex;

use crate::bundle::{BundleOptions, parse_template};
use crate::error::{ConfigError, Result};

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    /// Validate bundle options
    fn validate(&self, config: &BundleOptions) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use bale_config::{BundleOptions, SchemaValidator, ConfigValidator};
///
/// let config = BundleOptions::default().with_entry("src/main.js");
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &BundleOptions) -> Result<()> {
        if config.entries.is_empty() {
            return Err(ConfigError::NoEntries);
        }

        for external in &config.external {
            if external.trim().is_empty() {
                return Err(ConfigError::SchemaValidation {
                    message: "external package names cannot be empty".to_string(),
                    hint: Some("Remove empty strings from the 'external' array".to_string()),
                });
            }
        }

        if config.extensions.is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "at least one resolvable extension is required".to_string(),
                hint: Some("Restore the default `extensions` list".to_string()),
            });
        }
        if let Some(ext) = config.extensions.iter().find(|e| e.starts_with('.')) {
            return Err(ConfigError::SchemaValidation {
                message: format!("extension `{ext}` must not start with a dot"),
                hint: Some(format!("Use \"{}\"", ext.trim_start_matches('.'))),
            });
        }

        for (group_idx, group) in config.rules.iter().enumerate() {
            for (rule_idx, rule) in group.rules.iter().enumerate() {
                let field = format!("rules[{group_idx}].rules[{rule_idx}]");
                compile(&field, "test", &rule.test)?;
                if let Some(exclude) = &rule.exclude {
                    compile(&field, "exclude", exclude)?;
                }
            }
        }

        for (role, template) in config.filenames.iter() {
            parse_template(role, template)?;
        }

        if config.worker_count == Some(0) {
            return Err(ConfigError::SchemaValidation {
                message: "worker_count must be greater than zero".to_string(),
                hint: Some("Omit worker_count to use available parallelism".to_string()),
            });
        }

        if config.inline_limit > config.large_asset_bytes {
            return Err(ConfigError::SchemaValidation {
                message: format!(
                    "inline_limit ({}) exceeds large_asset_bytes ({})",
                    config.inline_limit, config.large_asset_bytes
                ),
                hint: Some("Assets above large_asset_bytes are never inlined".to_string()),
            });
        }

        if let Some(html) = &config.html {
            if html.filename.trim().is_empty() || html.filename.contains("..") {
                return Err(ConfigError::InvalidValue {
                    field: "html.filename".to_string(),
                    hint: Some("Use a plain relative name such as \"index.html\"".to_string()),
                });
            }
        }

        if config.step_timeout_ms == Some(0) {
            return Err(ConfigError::SchemaValidation {
                message: "step_timeout_ms must be greater than zero".to_string(),
                hint: Some("Omit step_timeout_ms to disable step timeouts".to_string()),
            });
        }

        Ok(())
    }
}

fn compile(field: &str, key: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| ConfigError::InvalidPattern {
        field: format!("{field}.{key}"),
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

/// Filesystem validator (for CLI use)
///
/// Runs schema validation, then checks that entry points and the cache
/// directory exist on disk.
pub struct FsValidator {
    root: std::path::PathBuf,
}

impl FsValidator {
    /// Create a new filesystem validator with a root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &BundleOptions) -> Result<()> {
        SchemaValidator.validate(config)?;

        for entry in &config.entries {
            let path = self.root.join(entry);
            if !path.exists() {
                return Err(ConfigError::EntryNotFound { path });
            }
        }

        if let Some(dir) = &config.cache.cache_dir {
            let path = self.root.join(dir);
            if !path.exists() {
                return Err(ConfigError::CacheDirNotWritable { path });
            }
        }

        Ok(())
    }
}

/// Convenience function for schema-only validation
pub fn validate_schema(config: &BundleOptions) -> Result<()> {
    SchemaValidator.validate(config)
}

/// Convenience function for filesystem validation
pub fn validate_fs(config: &BundleOptions, root: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(root).validate(config)
}
