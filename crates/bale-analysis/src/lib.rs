//! # bale-analysis
//!
//! Everything between a configured entry point and a complete module graph:
//!
//! - [`resolver`]: specifier → module identity
//! - [`transform`]: rule-selected step chains over module bytes
//! - [`walker`]: frontier-parallel graph construction with a cache seam and
//!   cancellation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//!
//! use bale_analysis::GraphBuilder;
//! use bale_config::BundleOptions;
//! use bale_graph::NativeRuntime;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let options = BundleOptions::default().with_entry("src/main.js");
//! let builder = GraphBuilder::new(&options, Path::new("/app"), Arc::new(NativeRuntime))?;
//! let built = builder.build(&options.entries).await?;
//!
//! for module in built.graph.modules() {
//!     println!("{} ({} bytes)", module.id, module.size);
//! }
//! # Ok(())
//! # }
//! ```

pub mod diagnostics;
pub mod resolver;
pub mod transform;
pub mod walker;

pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use resolver::{ResolveError, ResolveResult, Resolver, ResolverOptions};
pub use transform::{
    ModuleMeta, RuleSet, TransformChain, TransformError, TransformErrorKind, TransformOutput,
    TransformStep,
};
pub use walker::{
    BuildFailure, BuildGraph, CancelToken, CancellationSignal, CachedTransform, Fingerprint,
    GraphBuilder, GraphError, GraphOptions, TransformCache,
};
