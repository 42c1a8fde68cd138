//! Error types for the bale CLI.
//!
//! Command functions return [`CliError`]; `main` turns it into a miette
//! report. Bundler errors keep their own diagnostic codes and help text.

mod report;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] bale_bundler::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error with a path or hint attached by [`ResultExt`]
    #[error("{message}")]
    Context {
        message: String,
        hint: Option<String>,
        #[source]
        source: Option<Box<CliError>>,
    },
}

/// Errors while layering configuration sources.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A source could not be read or a value has the wrong shape
    #[error("{0}")]
    Load(Box<figment::Error>),

    #[error(transparent)]
    Invalid(#[from] bale_config::ConfigError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

impl From<bale_config::ConfigError> for CliError {
    fn from(err: bale_config::ConfigError) -> Self {
        CliError::Config(ConfigError::Invalid(err))
    }
}

impl CliError {
    /// Suggested fix, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            CliError::Config(ConfigError::NotFound(_)) => {
                Some("Create a bale.toml or pass --config <FILE>".to_string())
            }
            CliError::Config(ConfigError::Load(_)) => {
                Some("Check bale.toml and BALE_* variables for mistyped keys or values".to_string())
            }
            CliError::Config(ConfigError::Invalid(err)) => err.hint().map(str::to_string),
            CliError::Context { hint, .. } => hint.clone(),
            _ => None,
        }
    }
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Attach context to fallible operations.
pub trait ResultExt<T> {
    /// Name the file the operation was about.
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;

    /// Attach a suggested fix.
    fn with_hint(self, hint: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CliError>,
{
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|err| {
            let err = err.into();
            CliError::Context {
                message: format!("{}: {}", path.as_ref().display(), err),
                hint: err.hint(),
                source: Some(Box::new(err)),
            }
        })
    }

    fn with_hint(self, hint: impl Into<String>) -> Result<T> {
        self.map_err(|err| {
            let err = err.into();
            CliError::Context {
                message: err.to_string(),
                hint: Some(hint.into()),
                source: Some(Box::new(err)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn with_path_names_the_file() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let err = result.with_path("bale.toml").unwrap_err();
        assert!(err.to_string().starts_with("bale.toml: "));
    }

    #[test]
    fn with_hint_is_reported() {
        let result: Result<()> = Err(CliError::InvalidArgument("--jobs".into()));
        let err = result.with_hint("pass a positive number").unwrap_err();
        assert_eq!(err.hint().as_deref(), Some("pass a positive number"));
    }

    #[test]
    fn config_errors_carry_hints() {
        let err = CliError::from(bale_config::ConfigError::NoEntries);
        assert!(err.hint().is_some());
        let err: CliError = ConfigError::NotFound(PathBuf::from("x.toml")).into();
        assert!(err.hint().unwrap().contains("--config"));
    }
}
