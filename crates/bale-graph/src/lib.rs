//! # bale-graph
//!
//! Module graph primitives for the bale pipeline.
//!
//! This crate holds the data the rest of the pipeline agrees on:
//!
//! - [`ModuleId`]: resolved path plus normalized query
//! - [`Module`]: a transformed unit with its content hash and declared dependencies
//! - [`DependencyEdge`]: a resolved static or dynamic import
//! - [`ModuleGraph`]: discovery-ordered storage with forward and reverse edges
//! - [`Runtime`]: the filesystem seam every read and write goes through
//!
//! ## Quick Start
//!
//! ```rust
//! use bale_graph::{DependencyEdge, EdgeKind, Module, ModuleGraph, ModuleId, OutputKind};
//!
//! # fn main() -> bale_graph::Result<()> {
//! let graph = ModuleGraph::new();
//!
//! let main = ModuleId::new("/app/src/main.js");
//! let count = ModuleId::new("/app/src/js/count.js");
//!
//! graph.add_module(Module::builder(main.clone(), OutputKind::Script).entry(true).build())?;
//! graph.add_module(Module::builder(count.clone(), OutputKind::Script).build())?;
//! graph.add_edge(DependencyEdge::new(main.clone(), "./js/count", count.clone(), EdgeKind::Static))?;
//!
//! assert_eq!(graph.static_dependencies(&main), vec![count.clone()]);
//! assert_eq!(graph.dependents(&count), vec![main]);
//! # Ok(())
//! # }
//! ```

pub mod edge;
pub mod graph;
pub mod hash;
pub mod module;
pub mod module_id;
pub mod runtime;

pub use edge::{DeclaredDependency, DependencyEdge, EdgeKind};
pub use graph::ModuleGraph;
pub use hash::ContentHash;
pub use module::{AssetMode, Module, ModuleBuilder, OutputKind};
pub use module_id::{ModuleId, normalize_query, split_query};

// Re-export runtime types
pub use runtime::native::NativeRuntime;
pub use runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

#[cfg(any(test, feature = "test-utils"))]
pub use runtime::memory::MemoryRuntime;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    pub use super::runtime::memory::*;
}

/// Errors raised when mutating a graph.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("module already in graph: {0}")]
    DuplicateModule(ModuleId),

    #[error("module not in graph: {0}")]
    MissingModule(ModuleId),
}

pub type Result<T> = std::result::Result<T, Error>;
