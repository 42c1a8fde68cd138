//! In-memory module graph.
//!
//! Modules are kept in discovery order; edges are kept in declaration order
//! with forward and reverse indexes. Cycles are allowed: the graph stores
//! edges only and never requires a topological order.

mod mutations;
mod queries;
mod traversal;

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{DependencyEdge, Module, ModuleId};

#[derive(Debug, Default)]
pub(crate) struct GraphInner {
    pub(crate) modules: IndexMap<ModuleId, Arc<Module>>,
    pub(crate) edges: Vec<DependencyEdge>,
    /// importer -> indexes into `edges`
    pub(crate) outgoing: FxHashMap<ModuleId, Vec<usize>>,
    /// target -> indexes into `edges`
    pub(crate) incoming: FxHashMap<ModuleId, Vec<usize>>,
    pub(crate) entry_points: IndexSet<ModuleId>,
    /// external specifier -> importers
    pub(crate) externals: IndexMap<String, Vec<ModuleId>>,
}

/// Thread-safe handle to a module graph. Cloning shares the graph.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub(crate) inner: Arc<RwLock<GraphInner>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }
}
