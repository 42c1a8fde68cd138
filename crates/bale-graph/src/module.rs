use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::edge::DeclaredDependency;
use crate::hash::ContentHash;
use crate::module_id::ModuleId;

/// How the emitter decides between a data URL and a file for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetMode {
    /// Inline below the size threshold, file otherwise
    Auto,
    /// Always a file
    Resource,
    /// Always a data URL
    Inline,
}

/// What a module becomes in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Script,
    Style,
    Asset(AssetMode),
}

impl OutputKind {
    pub fn is_asset(self) -> bool {
        matches!(self, OutputKind::Asset(_))
    }
}

/// A transformed unit of the graph.
///
/// Modules are immutable once inserted into a `ModuleGraph`; heavy buffers are
/// behind `Arc` so handing them out is cheap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub path: PathBuf,
    pub output_kind: OutputKind,
    /// Digest of the source bytes, before any transform
    pub content_hash: ContentHash,
    /// Identity of the transform chain that produced `code`
    pub chain_id: String,
    /// Specifiers discovered by the chain, in declaration order
    pub dependencies: Arc<Vec<DeclaredDependency>>,
    /// Dependency specifiers this module accepts replacements for
    pub accepts: Arc<Vec<String>>,
    /// Module absorbs its own replacement (injected styles)
    pub self_accepting: bool,
    /// Transformed bytes
    pub code: Arc<Vec<u8>>,
    pub source_map: Option<Arc<String>>,
    pub is_entry: bool,
    /// Source size in bytes
    pub size: usize,
}

impl Module {
    /// Create a new module builder with sensible defaults.
    pub fn builder(id: ModuleId, output_kind: OutputKind) -> ModuleBuilder {
        ModuleBuilder {
            module: Self {
                path: id.path().to_path_buf(),
                id,
                output_kind,
                content_hash: ContentHash::of(&[]),
                chain_id: String::new(),
                dependencies: Arc::new(Vec::new()),
                accepts: Arc::new(Vec::new()),
                self_accepting: false,
                code: Arc::new(Vec::new()),
                source_map: None,
                is_entry: false,
                size: 0,
            },
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transformed code as UTF-8, lossy for binary assets
    pub fn code_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.code)
    }

    /// Get all declared specifiers.
    pub fn specifiers(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.specifier.as_str())
    }

    pub fn accepts_specifier(&self, specifier: &str) -> bool {
        self.accepts.iter().any(|s| s == specifier)
    }
}

/// Builder for `Module` to avoid long argument lists in constructors.
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    /// Set the source bytes; fills in the content hash and size.
    pub fn source(mut self, source: &[u8]) -> Self {
        self.module.content_hash = ContentHash::of(source);
        self.module.size = source.len();
        self
    }

    pub fn content_hash(mut self, hash: ContentHash) -> Self {
        self.module.content_hash = hash;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.module.size = size;
        self
    }

    pub fn code(mut self, code: impl Into<Vec<u8>>) -> Self {
        self.module.code = Arc::new(code.into());
        self
    }

    pub fn chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.module.chain_id = chain_id.into();
        self
    }

    pub fn dependencies(mut self, dependencies: Vec<DeclaredDependency>) -> Self {
        self.module.dependencies = Arc::new(dependencies);
        self
    }

    pub fn accepts(mut self, accepts: Vec<String>) -> Self {
        self.module.accepts = Arc::new(accepts);
        self
    }

    pub fn self_accepting(mut self, self_accepting: bool) -> Self {
        self.module.self_accepting = self_accepting;
        self
    }

    pub fn source_map(mut self, source_map: Option<String>) -> Self {
        self.module.source_map = source_map.map(Arc::new);
        self
    }

    pub fn entry(mut self, is_entry: bool) -> Self {
        self.module.is_entry = is_entry;
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeKind;

    #[test]
    fn builder_fills_hash_and_size() {
        let module = Module::builder(ModuleId::new("/app/src/main.js"), OutputKind::Script)
            .source(b"import './a.js'")
            .code(b"import './a.js'".to_vec())
            .dependencies(vec![DeclaredDependency::new("./a.js", EdgeKind::Static)])
            .entry(true)
            .build();

        assert_eq!(module.size, 15);
        assert_eq!(module.content_hash, ContentHash::of(b"import './a.js'"));
        assert_eq!(module.specifiers().collect::<Vec<_>>(), vec!["./a.js"]);
        assert!(module.is_entry);
        assert_eq!(module.path(), Path::new("/app/src/main.js"));
    }

    #[test]
    fn accepts_specifier_lookup() {
        let module = Module::builder(ModuleId::new("/app/main.js"), OutputKind::Script)
            .accepts(vec!["./js/count".into()])
            .build();
        assert!(module.accepts_specifier("./js/count"));
        assert!(!module.accepts_specifier("./js/sum"));
    }
}
