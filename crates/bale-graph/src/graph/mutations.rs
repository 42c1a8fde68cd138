//! Mutation methods for ModuleGraph.

use std::sync::Arc;

use super::ModuleGraph;
use crate::{DependencyEdge, Error, Module, ModuleId, Result};

impl ModuleGraph {
    /// Add a module into the graph. A module id can be inserted once.
    pub fn add_module(&self, module: Module) -> Result<()> {
        let mut inner = self.inner.write();

        if inner.modules.contains_key(&module.id) {
            return Err(Error::DuplicateModule(module.id));
        }

        if module.is_entry {
            inner.entry_points.insert(module.id.clone());
        }

        inner.modules.insert(module.id.clone(), Arc::new(module));
        Ok(())
    }

    /// Add a dependency edge, creating forward and reverse mappings.
    ///
    /// Both endpoints must already be in the graph. Adding an identical edge
    /// twice is a no-op.
    pub fn add_edge(&self, edge: DependencyEdge) -> Result<()> {
        let mut inner = self.inner.write();

        for endpoint in [&edge.importer, &edge.target] {
            if !inner.modules.contains_key(endpoint) {
                return Err(Error::MissingModule(endpoint.clone()));
            }
        }

        let duplicate = inner
            .outgoing
            .get(&edge.importer)
            .is_some_and(|idxs| idxs.iter().any(|&i| inner.edges[i] == edge));
        if duplicate {
            return Ok(());
        }

        let idx = inner.edges.len();
        inner
            .outgoing
            .entry(edge.importer.clone())
            .or_default()
            .push(idx);
        inner
            .incoming
            .entry(edge.target.clone())
            .or_default()
            .push(idx);
        inner.edges.push(edge);
        Ok(())
    }

    /// Record a specifier left to the runtime environment.
    pub fn add_external(&self, specifier: impl Into<String>, importer: ModuleId) {
        let mut inner = self.inner.write();
        let importers = inner.externals.entry(specifier.into()).or_default();
        if !importers.contains(&importer) {
            importers.push(importer);
        }
    }
}
