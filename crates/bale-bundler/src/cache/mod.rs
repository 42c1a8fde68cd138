//! Incremental build cache.
//!
//! - [`ModuleCache`]: the [`TransformCache`](bale_analysis::TransformCache)
//!   the graph builder consults, backed by a dashmap
//! - [`CacheStore`]: optional redb persistence under the cache directory
//! - [`ChangeDetector`]: content-hash diffing and affected-set computation

pub mod changes;
pub mod module_cache;
pub mod storage;

pub use changes::{ChangeDetector, ChangeSet};
pub use module_cache::{CacheStats, ModuleCache};
pub use storage::{CacheError, CacheStore};

use std::path::{Path, PathBuf};

use bale_config::CacheOptions;

/// Where the persistent cache lives for a project rooted at `root`.
///
/// Relative directories are taken relative to `root`; the default is
/// `node_modules/.cache/bale`.
pub fn resolve_cache_dir(options: &CacheOptions, root: &Path) -> PathBuf {
    match &options.cache_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => root.join(dir),
        None => root.join("node_modules").join(".cache").join("bale"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_defaults_under_node_modules() {
        let options = CacheOptions::default();
        assert_eq!(
            resolve_cache_dir(&options, Path::new("/app")),
            PathBuf::from("/app/node_modules/.cache/bale")
        );
    }

    #[test]
    fn relative_cache_dir_is_rooted() {
        let options = CacheOptions {
            enabled: true,
            cache_dir: Some(PathBuf::from(".bale-cache")),
        };
        assert_eq!(
            resolve_cache_dir(&options, Path::new("/app")),
            PathBuf::from("/app/.bale-cache")
        );
    }
}
