//! Specifier resolution.
//!
//! Turns an import specifier plus the importing module's path into a module
//! identity. Resolution order:
//!
//! 1. Configured externals (left as runtime imports)
//! 2. Path aliases, longest prefix first
//! 3. Relative (`./`, `../`) and absolute specifiers
//! 4. Bare specifiers under the package root, honouring `module`/`main`
//!
//! Local candidates are then probed as-is, with each configured extension
//! appended, and finally as a directory holding `index.<ext>`.
//!
//! The resolver holds no mutable state; its answer depends only on the
//! filesystem snapshot behind the [`Runtime`].

mod aliases;
mod extensions;
mod package;

pub use aliases::resolve_path_alias;
pub use extensions::{probe, try_extensions, try_index_files};
pub use package::{package_candidate, split_package};

use std::path::{Path, PathBuf};

use bale_config::BundleOptions;
use bale_graph::{ModuleId, Runtime, split_query};
use indexmap::IndexMap;

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    /// Module bundled from disk
    Local(ModuleId),
    /// Left as a runtime import
    External(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("cannot resolve '{specifier}' from {}", from.display())]
    AmbiguousOrMissingModule {
        specifier: String,
        from: PathBuf,
        tried: Vec<PathBuf>,
    },
}

impl ResolveError {
    pub fn specifier(&self) -> &str {
        match self {
            ResolveError::AmbiguousOrMissingModule { specifier, .. } => specifier,
        }
    }

    pub fn tried(&self) -> &[PathBuf] {
        match self {
            ResolveError::AmbiguousOrMissingModule { tried, .. } => tried,
        }
    }
}

/// Resolution settings, all paths absolute.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub root: PathBuf,
    pub package_root: PathBuf,
    pub extensions: Vec<String>,
    pub path_aliases: IndexMap<String, PathBuf>,
    pub external: Vec<String>,
}

impl ResolverOptions {
    /// Anchor bundle options at the project root.
    pub fn from_bundle(options: &BundleOptions, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            package_root: root.join(&options.package_root),
            extensions: options.extensions.clone(),
            path_aliases: options.path_aliases.clone(),
            external: options.external.clone(),
        }
    }
}

/// Module resolver.
#[derive(Debug, Clone)]
pub struct Resolver {
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve `specifier` as imported by the module at `from`.
    pub async fn resolve(
        &self,
        specifier: &str,
        from: &Path,
        runtime: &dyn Runtime,
    ) -> Result<ResolveResult, ResolveError> {
        let (bare, query) = split_query(specifier);

        if is_external(bare, &self.options.external) || is_url(bare) {
            return Ok(ResolveResult::External(specifier.to_string()));
        }

        let candidate = if let Some(aliased) =
            resolve_path_alias(bare, &self.options.root, &self.options.path_aliases)
        {
            aliased
        } else if is_relative(bare) {
            let dir = from.parent().unwrap_or(&self.options.root);
            dir.join(bare)
        } else if Path::new(bare).is_absolute() {
            PathBuf::from(bare)
        } else {
            package_candidate(bare, &self.options.package_root, runtime).await
        };

        let candidate = path_clean::clean(&candidate);
        let mut tried = Vec::new();
        match probe(&candidate, &self.options.extensions, runtime, &mut tried) {
            Some(found) => {
                tracing::trace!(specifier, resolved = %found.display(), "resolved");
                Ok(ResolveResult::Local(match query {
                    Some(query) => ModuleId::with_query(found, &query),
                    None => ModuleId::new(found),
                }))
            }
            None => Err(ResolveError::AmbiguousOrMissingModule {
                specifier: specifier.to_string(),
                from: from.to_path_buf(),
                tried,
            }),
        }
    }

    /// Resolve an entry point given relative to the project root.
    pub async fn resolve_entry(
        &self,
        entry: &Path,
        runtime: &dyn Runtime,
    ) -> Result<ModuleId, ResolveError> {
        let candidate = path_clean::clean(self.options.root.join(entry));
        let mut tried = Vec::new();
        probe(&candidate, &self.options.extensions, runtime, &mut tried)
            .map(ModuleId::new)
            .ok_or_else(|| ResolveError::AmbiguousOrMissingModule {
                specifier: entry.display().to_string(),
                from: self.options.root.clone(),
                tried,
            })
    }
}

/// Whether `specifier` is one of `externals` or a subpath of one.
pub fn is_external(specifier: &str, externals: &[String]) -> bool {
    externals.iter().any(|ext| {
        specifier == ext
            || specifier
                .strip_prefix(ext.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Specifiers that point outside the filesystem entirely.
pub fn is_url(specifier: &str) -> bool {
    specifier.starts_with("data:")
        || specifier.starts_with("http://")
        || specifier.starts_with("https://")
        || specifier.starts_with("//")
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}
