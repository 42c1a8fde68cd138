use serde::{Deserialize, Serialize};

use crate::ModuleId;

/// How a dependency was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// `import`, `export ... from`, `require()`, `@import`, `url()`
    Static,
    /// `import()`; the only legal chunk boundary
    Dynamic,
}

/// A specifier as written in the importer, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub specifier: String,
    pub kind: EdgeKind,
}

impl DeclaredDependency {
    pub fn new(specifier: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == EdgeKind::Dynamic
    }
}

/// A resolved dependency between two modules of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub importer: ModuleId,
    pub specifier: String,
    pub target: ModuleId,
    pub kind: EdgeKind,
}

impl DependencyEdge {
    pub fn new(
        importer: ModuleId,
        specifier: impl Into<String>,
        target: ModuleId,
        kind: EdgeKind,
    ) -> Self {
        Self {
            importer,
            specifier: specifier.into(),
            target,
            kind,
        }
    }
}
