//! # bale-bundler
//!
//! Turns a module graph into output files and keeps it warm between builds.
//!
//! - [`chunks`]: partitions the graph into entry, dynamic and common chunks
//! - [`emit`]: renders chunks into hashed script, style, asset and HTML files
//! - [`output`]: writes emitted assets under the output directory
//! - [`cache`]: fingerprinted transform cache, optionally persisted with redb
//! - [`session`]: watch-driven rebuilds with hot module replacement updates
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bale_bundler::BaleConfig;
//! use bale_graph::NativeRuntime;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = BaleConfig::default();
//! config.bundle = config.bundle.with_entry("src/main.js");
//!
//! let result = bale_bundler::build(&config, Arc::new(NativeRuntime)).await?;
//! for asset in &result.assets {
//!     println!("{} ({} bytes)", asset.filename, asset.size());
//! }
//! # Ok(()) }
//! ```

pub use bale_analysis::{Diagnostic, DiagnosticKind, GraphError, Severity};
pub use bale_config::{BaleConfig, BundleOptions, ConfigError, DevConfig};

pub mod build;
pub mod cache;
pub mod chunks;
pub mod emit;
pub mod output;
pub mod session;

pub use build::{BuildResult, BuildStats, Bundler, PreparedBuild, build};
pub use cache::{CacheError, ChangeDetector, ChangeSet, ModuleCache};
pub use chunks::{Chunk, ChunkKind, ChunkSet, split};
pub use emit::{AssetRole, EmitError, EmitOptions, EmittedAsset, Emitter};
pub use session::{
    AcceptorRegistry, ChangeEvent, ChangeKind, HmrUpdate, SessionEvent, SessionHandle,
    SessionOptions, start_session, start_session_with,
};

use bale_graph::RuntimeError;

/// Error types for bale-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The module graph could not be built.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Chunk rendering failed.
    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),

    /// The persistent cache could not be used.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Filesystem collaborator failed.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Output file already exists and overwrite is disabled.
    #[error("Output exists: {0}")]
    OutputExists(String),

    /// The development session has shut down.
    #[error("development session has stopped")]
    SessionClosed,
}

/// Result type alias for bale-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What a failed build cycle reports.
pub type BuildError = Error;

impl Error {
    /// Diagnostics collected before the failure, if the graph walk got that far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Graph(GraphError::Failed { diagnostics, .. }) => diagnostics,
            _ => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Graph(GraphError::Cancelled))
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "INVALID_CONFIG",
            Error::Graph(GraphError::Cancelled) => "BUILD_CANCELLED",
            Error::Graph(GraphError::UnresolvedEntry { .. }) => "UNRESOLVED_ENTRY",
            Error::Graph(_) => "BUILD_FAILED",
            Error::Emit(EmitError::Collision { .. }) => "OUTPUT_COLLISION",
            Error::Emit(_) => "EMIT_ERROR",
            Error::Cache(_) => "CACHE_ERROR",
            Error::Runtime(_) => "IO_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::OutputExists(_) => "OUTPUT_EXISTS",
            Error::SessionClosed => "SESSION_CLOSED",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Config(err) => err.hint().map(|h| Box::new(h.to_string()) as Box<dyn std::fmt::Display>),
            Error::Graph(GraphError::Failed { failures, .. }) => Some(Box::new(
                failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            )),
            Error::Graph(GraphError::UnresolvedEntry { entry, .. }) => Some(Box::new(format!(
                "Check that '{}' exists relative to the project root.",
                entry.display()
            ))),
            Error::Emit(EmitError::Collision { filename, .. }) => Some(Box::new(format!(
                "Two outputs render to '{filename}'.\nAdd {{hash}} or {{name}} to the filename template to tell them apart."
            ))),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{path}' is invalid. Ensure it's within the output directory and doesn't contain '..' components."
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {msg}"
            ))),
            Error::OutputExists(msg) => Some(Box::new(format!(
                "Output file already exists: {msg}\nEnable `clean` to empty the output directory first."
            ))),
            Error::Cache(_) => Some(Box::new(
                "Delete the cache directory or disable `cache.enabled` to build without it.",
            )),
            _ => None,
        }
    }
}
