//! Module replacement: who absorbs a change.
//!
//! A change to a module propagates up its importer chains. An importer that
//! accepts the dependency the change arrived through stops the propagation
//! there; a module that accepts itself stops it at the changed module. Any
//! chain that reaches an entry point unabsorbed forces a full reload.
//!
//! Acceptors come from two places: declarations registered on the
//! [`AcceptorRegistry`] before the session starts, and `module.hot.accept`
//! calls the transform chain found in module sources.

use std::path::{Path, PathBuf};

use bale_graph::{DependencyEdge, ModuleGraph, ModuleId};
use indexmap::{IndexMap, IndexSet};
use path_clean::PathClean;
use serde::Serialize;

/// Acceptor declarations keyed by importer path.
#[derive(Debug, Clone, Default)]
pub struct AcceptorRegistry {
    declared: IndexMap<PathBuf, Vec<String>>,
}

impl AcceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry from configured declarations; relative importer paths are
    /// taken relative to `root`.
    pub fn from_config(acceptors: &IndexMap<PathBuf, Vec<String>>, root: &Path) -> Self {
        let mut registry = Self::new();
        for (module, specifiers) in acceptors {
            let path = if module.is_absolute() {
                module.clone()
            } else {
                root.join(module)
            };
            registry.declare_acceptor(path, specifiers.iter().cloned());
        }
        registry
    }

    /// `module` will take replacements of the listed dependencies.
    pub fn declare_acceptor(
        &mut self,
        module: impl AsRef<Path>,
        dependency_specifiers: impl IntoIterator<Item = String>,
    ) {
        let entry = self.declared.entry(module.as_ref().clean()).or_default();
        for specifier in dependency_specifiers {
            if !entry.contains(&specifier) {
                entry.push(specifier);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// Whether the importer of `edge` accepts changes arriving through it.
    pub fn accepts(&self, graph: &ModuleGraph, edge: &DependencyEdge) -> bool {
        let in_source = graph
            .module(&edge.importer)
            .is_some_and(|module| module.accepts_specifier(&edge.specifier));
        if in_source {
            return true;
        }
        self.declared
            .get(edge.importer.path())
            .is_some_and(|specifiers| {
                specifiers
                    .iter()
                    .any(|declared| names_target(declared, edge))
            })
    }
}

/// A declared specifier names an edge when it is the edge's own specifier or
/// a relative path to its target, with or without the extension.
fn names_target(declared: &str, edge: &DependencyEdge) -> bool {
    if declared == edge.specifier {
        return true;
    }
    if !(declared.starts_with("./") || declared.starts_with("../")) {
        return false;
    }
    let Some(dir) = edge.importer.path().parent() else {
        return false;
    };
    let named = dir.join(declared).clean();
    let target = edge.target.path();
    named == target || named == target.with_extension("")
}

/// What the host should do after a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HmrUpdate {
    /// Acceptors that absorbed the change, in discovery order
    pub accepted_modules: Vec<ModuleId>,
    /// Modules whose factories must run again
    pub updated_modules: Vec<ModuleId>,
    pub requires_full_reload: bool,
}

impl HmrUpdate {
    fn full_reload(changed: &[ModuleId]) -> Self {
        Self {
            accepted_modules: Vec::new(),
            updated_modules: changed.to_vec(),
            requires_full_reload: true,
        }
    }
}

/// Decide how `changed` modules reach the running page.
///
/// With `hot` off every non-empty change is a full reload.
pub fn compute_update(
    graph: &ModuleGraph,
    changed: &[ModuleId],
    registry: &AcceptorRegistry,
    hot: bool,
) -> HmrUpdate {
    let changed: Vec<ModuleId> = changed.iter().filter(|id| graph.contains(id)).cloned().collect();
    if changed.is_empty() {
        return HmrUpdate::default();
    }
    if !hot {
        return HmrUpdate::full_reload(&changed);
    }

    let mut accepted: IndexSet<ModuleId> = IndexSet::new();
    let mut updated: IndexSet<ModuleId> = IndexSet::new();
    let mut full_reload = false;

    for start in &changed {
        let mut stack = vec![start.clone()];
        while let Some(id) = stack.pop() {
            if !updated.insert(id.clone()) {
                continue;
            }
            let Some(module) = graph.module(&id) else {
                continue;
            };
            if module.self_accepting {
                accepted.insert(id);
                continue;
            }

            let importers = graph.incoming(&id);
            if module.is_entry || importers.is_empty() {
                tracing::debug!(module = %id, "update reached an entry point");
                full_reload = true;
                continue;
            }
            for edge in importers {
                if registry.accepts(graph, &edge) {
                    accepted.insert(edge.importer.clone());
                } else {
                    stack.push(edge.importer);
                }
            }
        }
    }

    HmrUpdate {
        accepted_modules: accepted.into_iter().collect(),
        updated_modules: updated.into_iter().collect(),
        requires_full_reload: full_reload,
    }
}
