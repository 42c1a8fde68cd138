//! The transform cache handed to the graph builder.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use bale_analysis::{CachedTransform, Diagnostic, DiagnosticKind, Fingerprint, TransformCache, TransformOutput};
use bale_graph::ModuleId;
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use super::storage::{CacheError, CacheStore};

/// Hit and miss counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// In-memory transform cache, optionally mirrored to a [`CacheStore`].
///
/// Lookups only ever hit memory. Fresh transforms reach memory and disk
/// through [`ModuleCache::commit`] once a build has completed, so a
/// cancelled or failed build leaves the cache untouched.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: DashMap<ModuleId, CachedTransform>,
    store: Option<CacheStore>,
    /// Modules of the last committed graph
    live: Mutex<Option<FxHashSet<ModuleId>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ModuleCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store in `cache_dir` and load its entries.
    ///
    /// An unusable store is discarded and recreated; the returned diagnostics
    /// say so and the cache starts cold.
    pub fn persistent(cache_dir: &Path) -> Result<(Self, Vec<Diagnostic>), CacheError> {
        let (store, recreated) = CacheStore::open_or_recreate(cache_dir)?;
        let mut diagnostics: Vec<Diagnostic> = recreated.into_iter().collect();

        let entries = DashMap::new();
        match store.load_all() {
            Ok(loaded) => {
                for entry in loaded {
                    entries.insert(entry.module.clone(), entry);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping unreadable cache entries");
                store.clear()?;
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::CacheCorruption,
                        format!("cache at {} was cleared: {err}", store.path().display()),
                    )
                    .with_help("the build continues without cached transforms"),
                );
            }
        }

        tracing::debug!(entries = entries.len(), path = %store.path().display(), "opened transform cache");
        Ok((
            Self {
                entries,
                store: Some(store),
                ..Self::default()
            },
            diagnostics,
        ))
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Record a completed build: store its fresh transforms and remember
    /// which modules it contained.
    pub fn commit(&self, fresh: Vec<CachedTransform>, live: &[ModuleId]) -> Result<(), CacheError> {
        if let Some(store) = &self.store {
            store.put_many(&fresh)?;
        }
        for entry in fresh {
            self.entries.insert(entry.module.clone(), entry);
        }
        *self.live.lock() = Some(live.iter().cloned().collect());
        Ok(())
    }

    /// Drop entries for modules the last committed build no longer had.
    pub fn evict_stale(&self) -> Result<usize, CacheError> {
        let Some(live) = self.live.lock().clone() else {
            return Ok(0);
        };
        let before = self.entries.len();
        self.entries.retain(|id, _| live.contains(id));
        let evicted = before - self.entries.len();

        if let Some(store) = &self.store {
            let keep: FxHashSet<String> = live.iter().map(ToString::to_string).collect();
            store.retain(|key| keep.contains(key))?;
        }
        if evicted > 0 {
            tracing::debug!(evicted, "evicted cache entries for removed modules");
        }
        Ok(evicted)
    }

    /// Forget `id`'s transform.
    pub fn invalidate(&self, id: &ModuleId) {
        self.entries.remove(id);
        if let Some(store) = &self.store {
            if let Err(err) = store.remove(&id.to_string()) {
                tracing::warn!(module = %id, error = %err, "failed to remove cache entry");
            }
        }
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl TransformCache for ModuleCache {
    fn get(&self, id: &ModuleId, fingerprint: &Fingerprint) -> Option<TransformOutput> {
        let found = self
            .entries
            .get(id)
            .filter(|entry| entry.fingerprint == *fingerprint)
            .map(|entry| entry.output.clone());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn put(&self, entry: CachedTransform) {
        self.entries.insert(entry.module.clone(), entry);
    }
}
