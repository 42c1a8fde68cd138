use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use super::ModuleGraph;
use crate::{EdgeKind, ModuleId};

impl ModuleGraph {
    /// Modules reachable from `root` through static edges (root included),
    /// sorted by discovery order.
    pub fn static_closure(&self, root: &ModuleId) -> Vec<ModuleId> {
        if !self.contains(root) {
            return Vec::new();
        }

        let mut visited: FxHashSet<ModuleId> = FxHashSet::default();
        let mut queue = VecDeque::from([root.clone()]);
        visited.insert(root.clone());

        while let Some(current) = queue.pop_front() {
            for next in self.static_dependencies(&current) {
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }

        self.sort_by_discovery(visited.into_iter().collect())
    }

    /// Every module that imports any of `seeds`, directly or transitively,
    /// through static or dynamic edges. Seeds themselves are not included
    /// unless they sit on a cycle back to a seed.
    pub fn transitive_dependents(&self, seeds: &[ModuleId]) -> Vec<ModuleId> {
        let mut visited: FxHashSet<ModuleId> = FxHashSet::default();
        let mut queue: VecDeque<ModuleId> = seeds.iter().cloned().collect();

        while let Some(current) = queue.pop_front() {
            for importer in self.dependents(&current) {
                if visited.insert(importer.clone()) {
                    queue.push_back(importer);
                }
            }
        }

        self.sort_by_discovery(visited.into_iter().collect())
    }

    /// Dynamic import targets that `entries` can actually load, sorted by
    /// discovery order.
    ///
    /// A dynamic edge only counts when its importer sits in the static
    /// closure of an entry or of a dynamic root already found. Entries
    /// themselves are never returned.
    pub fn dynamic_roots(&self, entries: &[ModuleId]) -> Vec<ModuleId> {
        let mut seen: FxHashSet<ModuleId> = entries.iter().cloned().collect();
        let mut roots: Vec<ModuleId> = Vec::new();
        let mut pending: Vec<ModuleId> = entries.iter().filter(|e| self.contains(e)).cloned().collect();

        while let Some(root) = pending.pop() {
            for id in self.static_closure(&root) {
                for edge in self.outgoing(&id) {
                    if edge.kind == EdgeKind::Dynamic && seen.insert(edge.target.clone()) {
                        roots.push(edge.target.clone());
                        pending.push(edge.target);
                    }
                }
            }
        }

        self.sort_by_discovery(roots)
    }

    /// Sort ids by discovery index; ids not in the graph go last.
    pub fn sort_by_discovery(&self, mut ids: Vec<ModuleId>) -> Vec<ModuleId> {
        let inner = self.inner.read();
        ids.sort_by_key(|id| inner.modules.get_index_of(id).unwrap_or(usize::MAX));
        ids
    }
}
