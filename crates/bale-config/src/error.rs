//! Error types for configuration validation and loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Filesystem validation errors (for CLI use)
    #[error("entry path not found: {}", path.display())]
    EntryNotFound { path: PathBuf },

    #[error("cache directory is not writable: {}", path.display())]
    CacheDirNotWritable { path: PathBuf },

    // Config parsing/loading errors
    #[error("config not found")]
    NotFound,

    #[error("could not parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid config value for `{field}`")]
    InvalidValue { field: String, hint: Option<String> },

    #[error("invalid profile override: {message}")]
    InvalidProfileOverride { message: String },

    // Schema validation errors (no filesystem checks)
    #[error("no entries specified")]
    NoEntries,

    #[error("schema validation failed: {message}")]
    SchemaValidation {
        message: String,
        hint: Option<String>,
    },

    #[error("invalid pattern `{pattern}` in {field}: {message}")]
    InvalidPattern {
        field: String,
        pattern: String,
        message: String,
    },

    #[error("invalid filename template `{template}` for {role}: {message}")]
    InvalidTemplate {
        role: String,
        template: String,
        message: String,
    },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Remediation hint attached to the error, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidValue { hint, .. } | ConfigError::SchemaValidation { hint, .. } => {
                hint.as_deref()
            }
            ConfigError::NoEntries => Some("Add at least one path to `bundle.entries`"),
            ConfigError::NotFound => Some("Create a bale.toml or bale.json, or add a \"bale\" field to package.json"),
            ConfigError::InvalidTemplate { .. } => Some(
                "Supported placeholders are {name}, {ext}, {query}, {hash}, {hash:N} and {file}",
            ),
            _ => None,
        }
    }
}
