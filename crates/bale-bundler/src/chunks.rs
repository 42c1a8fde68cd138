//! Chunk splitting.
//!
//! Chunk roots are the entry points in declared order followed by the
//! targets of dynamic edges in discovery order. Each root floods over static
//! edges only, so dynamic edges are the only chunk boundaries.
//!
//! A module reached from more than one root is *shared*. With
//! [`SplitStrategy::Duplicate`] it is copied into every chunk that reaches
//! it, which costs output size but keeps every chunk self-contained. With
//! [`SplitStrategy::Hoist`] shared modules move into a single `common` chunk
//! that the other chunks list in [`Chunk::requires`].

use bale_config::SplitStrategy;
use bale_graph::{ModuleGraph, ModuleId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Why a chunk exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Entry,
    Dynamic,
    Common,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    /// Root module; `None` for the common chunk
    pub root: Option<ModuleId>,
    pub kind: ChunkKind,
    /// Members in discovery order
    pub modules: Vec<ModuleId>,
    /// Members that other roots reach as well
    pub shared: FxHashSet<ModuleId>,
    /// Chunks that must be loaded before this one runs
    pub requires: Vec<String>,
}

impl Chunk {
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// The chunks of one build, in root order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSet {
    chunks: Vec<Chunk>,
}

impl ChunkSet {
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == id)
    }

    /// The chunk rooted at `root`
    pub fn by_root(&self, root: &ModuleId) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.root.as_ref() == Some(root))
    }

    /// Every chunk containing `module`
    pub fn containing<'a>(&'a self, module: &'a ModuleId) -> impl Iterator<Item = &'a Chunk> {
        self.chunks.iter().filter(move |c| c.contains(module))
    }

    /// Distinct modules across all chunks
    pub fn covered(&self) -> FxHashSet<ModuleId> {
        self.chunks
            .iter()
            .flat_map(|c| c.modules.iter().cloned())
            .collect()
    }
}

impl<'a> IntoIterator for &'a ChunkSet {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Partition `graph` into chunks rooted at `entries` and at every dynamic
/// import target the entries can reach.
pub fn split(graph: &ModuleGraph, entries: &[ModuleId], strategy: SplitStrategy) -> ChunkSet {
    let mut roots: Vec<(ModuleId, ChunkKind)> = Vec::new();
    let mut seen: FxHashSet<ModuleId> = FxHashSet::default();
    for entry in entries.iter().filter(|e| graph.contains(e)) {
        if seen.insert(entry.clone()) {
            roots.push((entry.clone(), ChunkKind::Entry));
        }
    }
    let entry_roots: Vec<ModuleId> = roots.iter().map(|(id, _)| id.clone()).collect();
    for dynamic in graph.dynamic_roots(&entry_roots) {
        if seen.insert(dynamic.clone()) {
            roots.push((dynamic, ChunkKind::Dynamic));
        }
    }

    let closures: Vec<Vec<ModuleId>> = roots
        .iter()
        .map(|(root, _)| graph.static_closure(root))
        .collect();

    let mut reach: FxHashMap<&ModuleId, usize> = FxHashMap::default();
    for closure in &closures {
        for id in closure {
            *reach.entry(id).or_default() += 1;
        }
    }
    let shared: FxHashSet<ModuleId> = reach
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(id, _)| (*id).clone())
        .collect();

    let mut names = ChunkNames::default();
    let mut chunks: Vec<Chunk> = Vec::with_capacity(roots.len() + 1);

    for (index, ((root, kind), closure)) in roots.iter().zip(&closures).enumerate() {
        let id = names.claim(logical_name(root), index);
        let chunk_shared: FxHashSet<ModuleId> = closure
            .iter()
            .filter(|m| shared.contains(*m))
            .cloned()
            .collect();
        chunks.push(Chunk {
            id,
            root: Some(root.clone()),
            kind: *kind,
            modules: closure.clone(),
            shared: chunk_shared,
            requires: Vec::new(),
        });
    }

    if strategy == SplitStrategy::Hoist && !shared.is_empty() {
        let common_id = names.claim(Some("common".to_string()), chunks.len());
        for chunk in &mut chunks {
            if chunk.shared.is_empty() {
                continue;
            }
            chunk.modules.retain(|m| !shared.contains(m));
            chunk.requires.push(common_id.clone());
        }
        let modules = graph.sort_by_discovery(shared.iter().cloned().collect());
        tracing::debug!(chunk = %common_id, modules = modules.len(), "hoisted shared modules");
        chunks.push(Chunk {
            id: common_id,
            root: None,
            kind: ChunkKind::Common,
            modules,
            shared: FxHashSet::default(),
            requires: Vec::new(),
        });
    }

    tracing::debug!(chunks = chunks.len(), shared = shared.len(), ?strategy, "split graph");
    ChunkSet { chunks }
}

/// File stem reduced to `[A-Za-z0-9_.-]`; `None` when nothing is left.
fn logical_name(id: &ModuleId) -> Option<String> {
    let stem = id.path().file_stem()?.to_string_lossy();
    let name: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    let name = name.trim_matches('.').to_string();
    (!name.is_empty()).then_some(name)
}

#[derive(Default)]
struct ChunkNames {
    taken: FxHashSet<String>,
}

impl ChunkNames {
    fn claim(&mut self, name: Option<String>, index: usize) -> String {
        let base = name.unwrap_or_else(|| format!("chunk-{index}"));
        let mut candidate = base.clone();
        let mut suffix = 2;
        while !self.taken.insert(candidate.clone()) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_graph::{DependencyEdge, EdgeKind, Module, OutputKind};
    use proptest::prelude::*;

    fn add(graph: &ModuleGraph, path: &str, entry: bool) -> ModuleId {
        let id = ModuleId::new(path);
        graph
            .add_module(
                Module::builder(id.clone(), OutputKind::Script)
                    .entry(entry)
                    .build(),
            )
            .unwrap();
        id
    }

    fn link(graph: &ModuleGraph, from: &ModuleId, to: &ModuleId, kind: EdgeKind) {
        graph
            .add_edge(DependencyEdge::new(
                from.clone(),
                format!("./{}", to.name()),
                to.clone(),
                kind,
            ))
            .unwrap();
    }

    /// main -> count (static), main -> math (dynamic), count -> sum, math -> sum
    fn demo() -> (ModuleGraph, ModuleId, ModuleId, ModuleId, ModuleId) {
        let graph = ModuleGraph::new();
        let main = add(&graph, "/app/src/main.js", true);
        let count = add(&graph, "/app/src/js/count.js", false);
        let math = add(&graph, "/app/src/js/math.js", false);
        let sum = add(&graph, "/app/src/js/sum.js", false);
        link(&graph, &main, &count, EdgeKind::Static);
        link(&graph, &main, &math, EdgeKind::Dynamic);
        link(&graph, &count, &sum, EdgeKind::Static);
        link(&graph, &math, &sum, EdgeKind::Static);
        (graph, main, count, math, sum)
    }

    #[test]
    fn dynamic_import_starts_a_chunk() {
        let (graph, main, count, math, sum) = demo();
        let chunks = split(&graph, &[main.clone()], SplitStrategy::Duplicate);

        assert_eq!(chunks.len(), 2);
        let main_chunk = chunks.get("main").unwrap();
        assert_eq!(main_chunk.kind, ChunkKind::Entry);
        assert_eq!(main_chunk.modules, vec![main, count.clone(), sum.clone()]);

        let math_chunk = chunks.get("math").unwrap();
        assert_eq!(math_chunk.kind, ChunkKind::Dynamic);
        assert_eq!(math_chunk.modules, vec![math.clone(), sum.clone()]);

        assert_eq!(chunks.containing(&count).count(), 1);
        assert_eq!(chunks.containing(&math).count(), 1);
        assert!(main_chunk.shared.contains(&sum));
        assert!(math_chunk.shared.contains(&sum));
    }

    #[test]
    fn hoist_moves_shared_modules_to_common() {
        let (graph, main, _, math, sum) = demo();
        let chunks = split(&graph, &[main], SplitStrategy::Hoist);

        assert_eq!(chunks.len(), 3);
        let common = chunks.get("common").unwrap();
        assert_eq!(common.kind, ChunkKind::Common);
        assert_eq!(common.modules, vec![sum.clone()]);
        assert_eq!(chunks.containing(&sum).count(), 1);
        assert_eq!(chunks.get("main").unwrap().requires, vec!["common"]);
        assert_eq!(chunks.by_root(&math).unwrap().requires, vec!["common"]);
    }

    #[test]
    fn colliding_stems_get_suffixes() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "/app/src/main.js", true);
        let a = add(&graph, "/app/src/a/index.js", false);
        let b = add(&graph, "/app/src/b/index.js", false);
        link(&graph, &main, &a, EdgeKind::Dynamic);
        link(&graph, &main, &b, EdgeKind::Dynamic);

        let chunks = split(&graph, &[main], SplitStrategy::Duplicate);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["main", "index", "index-2"]);
    }

    #[test]
    fn nameless_root_gets_an_index() {
        let graph = ModuleGraph::new();
        let main = add(&graph, "/app/main.js", true);
        let odd = add(&graph, "/app/@@@.js", false);
        link(&graph, &main, &odd, EdgeKind::Dynamic);

        let chunks = split(&graph, &[main], SplitStrategy::Duplicate);
        assert_eq!(chunks.by_root(&odd).unwrap().id, "chunk-1");
    }

    #[test]
    fn unreachable_modules_are_excluded() {
        let (graph, main, ..) = demo();
        let orphan = add(&graph, "/app/src/orphan.js", false);
        let chunks = split(&graph, &[main], SplitStrategy::Duplicate);
        assert!(!chunks.covered().contains(&orphan));
    }

    proptest! {
        #[test]
        fn every_reachable_module_is_covered(
            edges in proptest::collection::vec((0usize..8, 0usize..8, any::<bool>()), 0..20),
            strategy in prop_oneof![Just(SplitStrategy::Duplicate), Just(SplitStrategy::Hoist)],
        ) {
            let graph = ModuleGraph::new();
            let ids: Vec<ModuleId> = (0..8)
                .map(|i| add(&graph, &format!("/app/m{i}.js"), i == 0))
                .collect();
            let mut linked = FxHashSet::default();
            for (from, to, dynamic) in edges {
                if linked.insert((from, to)) {
                    let kind = if dynamic { EdgeKind::Dynamic } else { EdgeKind::Static };
                    link(&graph, &ids[from], &ids[to], kind);
                }
            }

            let chunks = split(&graph, &ids[..1], strategy);

            let mut reachable = FxHashSet::default();
            let mut stack = vec![ids[0].clone()];
            while let Some(current) = stack.pop() {
                if reachable.insert(current.clone()) {
                    stack.extend(graph.outgoing(&current).into_iter().map(|e| e.target));
                }
            }
            prop_assert_eq!(chunks.covered(), reachable);
        }
    }
}
