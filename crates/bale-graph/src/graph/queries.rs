use std::sync::Arc;

use super::ModuleGraph;
use crate::{DependencyEdge, EdgeKind, Module, ModuleId};

impl ModuleGraph {
    pub fn module(&self, id: &ModuleId) -> Option<Arc<Module>> {
        self.inner.read().modules.get(id).cloned()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.inner.read().modules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().modules.is_empty()
    }

    /// All modules in discovery order.
    pub fn modules(&self) -> Vec<Arc<Module>> {
        self.inner.read().modules.values().cloned().collect()
    }

    /// All module ids in discovery order.
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.inner.read().modules.keys().cloned().collect()
    }

    /// Position of a module in discovery order.
    pub fn discovery_index(&self, id: &ModuleId) -> Option<usize> {
        self.inner.read().modules.get_index_of(id)
    }

    /// Entry points in declared order.
    pub fn entry_points(&self) -> Vec<ModuleId> {
        self.inner.read().entry_points.iter().cloned().collect()
    }

    pub fn is_entry(&self, id: &ModuleId) -> bool {
        self.inner.read().entry_points.contains(id)
    }

    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.inner.read().edges.clone()
    }

    /// Edges leaving `id`, in declaration order.
    pub fn outgoing(&self, id: &ModuleId) -> Vec<DependencyEdge> {
        let inner = self.inner.read();
        inner
            .outgoing
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| inner.edges[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Edges pointing at `id`, in insertion order.
    pub fn incoming(&self, id: &ModuleId) -> Vec<DependencyEdge> {
        let inner = self.inner.read();
        inner
            .incoming
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| inner.edges[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Targets of static edges leaving `id`.
    pub fn static_dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.targets(id, EdgeKind::Static)
    }

    /// Targets of dynamic edges leaving `id`.
    pub fn dynamic_dependencies(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.targets(id, EdgeKind::Dynamic)
    }

    fn targets(&self, id: &ModuleId, kind: EdgeKind) -> Vec<ModuleId> {
        let mut targets: Vec<ModuleId> = Vec::new();
        for edge in self.outgoing(id) {
            if edge.kind == kind && !targets.contains(&edge.target) {
                targets.push(edge.target);
            }
        }
        targets
    }

    /// Modules importing `id` through any edge kind.
    pub fn dependents(&self, id: &ModuleId) -> Vec<ModuleId> {
        let mut importers: Vec<ModuleId> = Vec::new();
        for edge in self.incoming(id) {
            if !importers.contains(&edge.importer) {
                importers.push(edge.importer);
            }
        }
        importers
    }

    /// External specifiers with the modules that import them.
    pub fn externals(&self) -> Vec<(String, Vec<ModuleId>)> {
        self.inner
            .read()
            .externals
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Sum of source sizes.
    pub fn total_size(&self) -> usize {
        self.inner.read().modules.values().map(|m| m.size).sum()
    }
}
