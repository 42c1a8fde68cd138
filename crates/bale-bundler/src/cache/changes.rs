//! Change detection between builds.
//!
//! Compares module content hashes of two graphs and computes which modules
//! a change reaches through reverse edges.

use bale_graph::{ContentHash, ModuleGraph, ModuleId};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// Content hashes of the modules in one graph.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    pub module_hashes: HashMap<ModuleId, ContentHash>,
}

/// Modules that differ between two graphs.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Content hash changed
    pub modified: HashSet<ModuleId>,
    /// Not in the previous graph
    pub added: HashSet<ModuleId>,
    /// Not in the current graph
    pub removed: HashSet<ModuleId>,
    /// Direct changes only; see [`ChangeDetector::compute_affected`]
    pub affected: HashSet<ModuleId>,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.modified.is_empty() || !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn affected_count(&self) -> usize {
        self.affected.len()
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the content hashes of `graph`.
    pub fn from_graph(graph: &ModuleGraph) -> Self {
        Self {
            module_hashes: graph
                .modules()
                .into_iter()
                .map(|module| (module.id.clone(), module.content_hash))
                .collect(),
        }
    }

    /// Compare the snapshot against `graph`.
    pub fn detect_changes(&self, graph: &ModuleGraph) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let mut current: HashSet<ModuleId> = HashSet::default();

        for module in graph.modules() {
            current.insert(module.id.clone());
            match self.module_hashes.get(&module.id) {
                Some(previous) if *previous != module.content_hash => {
                    changes.modified.insert(module.id.clone());
                }
                Some(_) => {}
                None => {
                    changes.added.insert(module.id.clone());
                }
            }
        }

        changes.removed = self
            .module_hashes
            .keys()
            .filter(|id| !current.contains(*id))
            .cloned()
            .collect();

        changes.affected.extend(changes.modified.iter().cloned());
        changes.affected.extend(changes.added.iter().cloned());
        changes.affected.extend(changes.removed.iter().cloned());
        changes
    }

    /// `changed` plus every module that imports one of them, statically or
    /// dynamically, at any depth.
    pub fn compute_affected(&self, changed: &HashSet<ModuleId>, graph: &ModuleGraph) -> HashSet<ModuleId> {
        let mut affected = changed.clone();
        let mut to_visit: Vec<ModuleId> = changed.iter().cloned().collect();

        while let Some(module_id) = to_visit.pop() {
            for dependent in graph.dependents(&module_id) {
                if affected.insert(dependent.clone()) {
                    to_visit.push(dependent);
                }
            }
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_graph::{DependencyEdge, EdgeKind, Module, OutputKind};

    fn chain(code_c: &str) -> (ModuleGraph, [ModuleId; 3]) {
        let graph = ModuleGraph::new();
        let a = ModuleId::new("/app/a.js");
        let b = ModuleId::new("/app/b.js");
        let c = ModuleId::new("/app/c.js");
        for (id, code) in [(&a, "a"), (&b, "b"), (&c, code_c)] {
            graph
                .add_module(Module::builder(id.clone(), OutputKind::Script).source(code.as_bytes()).build())
                .unwrap();
        }
        graph
            .add_edge(DependencyEdge::new(a.clone(), "./b", b.clone(), EdgeKind::Static))
            .unwrap();
        graph
            .add_edge(DependencyEdge::new(b.clone(), "./c", c.clone(), EdgeKind::Dynamic))
            .unwrap();
        (graph, [a, b, c])
    }

    #[test]
    fn detects_modified_module() {
        let (before, _) = chain("c1");
        let (after, [_, _, c]) = chain("c2");
        let changes = ChangeDetector::from_graph(&before).detect_changes(&after);
        assert!(changes.has_changes());
        assert_eq!(changes.modified, HashSet::from_iter([c]));
        assert!(changes.added.is_empty());
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn unchanged_graph_has_no_changes() {
        let (before, _) = chain("c");
        let (after, _) = chain("c");
        assert!(!ChangeDetector::from_graph(&before).detect_changes(&after).has_changes());
    }

    #[test]
    fn affected_follows_static_and_dynamic_importers() {
        let (graph, [a, b, c]) = chain("c");
        let detector = ChangeDetector::new();
        let affected = detector.compute_affected(&HashSet::from_iter([c.clone()]), &graph);
        assert_eq!(affected, HashSet::from_iter([a, b.clone(), c]));

        let only_b = detector.compute_affected(&HashSet::from_iter([b.clone()]), &graph);
        assert_eq!(only_b.len(), 2);
    }
}
