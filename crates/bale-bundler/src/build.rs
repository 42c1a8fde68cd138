//! One build cycle: walk, split, emit, write, commit.
//!
//! [`Bundler`] owns everything that outlives a single cycle (options, the
//! filesystem collaborator and the transform cache) so a dev session can run
//! it repeatedly. [`build`] is the one-shot entry point.
//!
//! A cycle has two phases. [`Bundler::prepare`] walks, splits and emits in
//! memory and may be cancelled at any point. [`Bundler::write`] touches the
//! output directory and the cache and always runs to completion once begun.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bale_analysis::{
    BuildGraph, CancelToken, Diagnostic, DiagnosticKind, GraphBuilder, GraphError, TransformCache,
};
use bale_config::{BaleConfig, BundleOptions, validate_schema};
use bale_graph::{ModuleGraph, ModuleId, Runtime};
use parking_lot::Mutex;
use serde::Serialize;

use crate::cache::{ModuleCache, resolve_cache_dir};
use crate::chunks::{ChunkSet, split};
use crate::emit::{EmitError, EmitOptions, EmittedAsset, Emitter};
use crate::output::{clean_dir, write_assets};
use crate::{Error, Result};

/// Counters for one completed build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub modules: usize,
    pub chunks: usize,
    pub assets: usize,
    /// Modules whose transform chain ran
    pub transformed: usize,
    pub cache_hits: usize,
    pub total_bytes: u64,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u128(duration.as_millis())
}

/// Everything a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub graph: ModuleGraph,
    /// Entry modules in declared order
    pub entries: Vec<ModuleId>,
    pub chunks: ChunkSet,
    pub assets: Vec<EmittedAsset>,
    /// Files written to the output directory, in asset order
    pub written: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    /// Modules re-transformed in this cycle, in completion order
    pub transformed: Vec<ModuleId>,
    pub stats: BuildStats,
}

impl BuildResult {
    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn assets_for_chunk<'a>(&'a self, chunk: &'a str) -> impl Iterator<Item = &'a EmittedAsset> {
        self.assets
            .iter()
            .filter(move |asset| asset.chunk.as_deref() == Some(chunk))
    }
}

/// A build that has been emitted but not yet written.
#[derive(Debug, Clone)]
pub struct PreparedBuild {
    started: Instant,
    built: BuildGraph,
    chunks: ChunkSet,
    assets: Vec<EmittedAsset>,
    diagnostics: Vec<Diagnostic>,
}

impl PreparedBuild {
    pub fn assets(&self) -> &[EmittedAsset] {
        &self.assets
    }
}

/// Reusable build driver.
#[derive(Debug)]
pub struct Bundler {
    options: BundleOptions,
    root: PathBuf,
    runtime: Arc<dyn Runtime>,
    cache: Arc<ModuleCache>,
    /// Cache-opening diagnostics, reported with the next build
    pending: Mutex<Vec<Diagnostic>>,
    hot: bool,
    write: bool,
}

impl Bundler {
    /// Bundler for `options` rooted at `root`.
    ///
    /// Validates the options and opens the persistent cache when it is
    /// enabled. A cache directory that cannot be opened degrades to an
    /// in-memory cache with a warning.
    pub fn new(options: BundleOptions, root: impl Into<PathBuf>, runtime: Arc<dyn Runtime>) -> Result<Self> {
        validate_schema(&options)?;
        let root = root.into();

        let mut pending = Vec::new();
        let cache = if options.cache.enabled {
            let dir = resolve_cache_dir(&options.cache, &root);
            match ModuleCache::persistent(&dir) {
                Ok((cache, diagnostics)) => {
                    pending.extend(diagnostics);
                    cache
                }
                Err(err) => {
                    tracing::warn!(path = %dir.display(), error = %err, "falling back to in-memory cache");
                    pending.push(
                        Diagnostic::warning(
                            DiagnosticKind::CacheCorruption,
                            format!("cache at {} is unavailable: {err}", dir.display()),
                        )
                        .with_help("transforms are cached in memory for this process only"),
                    );
                    ModuleCache::in_memory()
                }
            }
        } else {
            ModuleCache::in_memory()
        };

        Ok(Self {
            options,
            root,
            runtime,
            cache: Arc::new(cache),
            pending: Mutex::new(pending),
            hot: false,
            write: true,
        })
    }

    /// Render scripts with the hot update runtime.
    pub fn with_hot(mut self, hot: bool) -> Self {
        self.hot = hot;
        self
    }

    /// Skip writing the output directory; assets are only returned.
    pub fn without_output(mut self) -> Self {
        self.write = false;
        self
    }

    pub fn with_cache(mut self, cache: Arc<ModuleCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn options(&self) -> &BundleOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    /// Absolute output directory.
    pub fn output_dir(&self) -> PathBuf {
        if self.options.output_dir.is_absolute() {
            self.options.output_dir.clone()
        } else {
            self.root.join(&self.options.output_dir)
        }
    }

    pub async fn build(&self) -> Result<BuildResult> {
        self.build_with(None).await
    }

    /// Run one cycle, abandoning it once `cancel` is superseded.
    ///
    /// Cancellation is only observed while preparing. The cache only learns
    /// about this cycle if it completes: a cancelled or failed build commits
    /// nothing.
    pub async fn build_with(&self, cancel: Option<CancelToken>) -> Result<BuildResult> {
        let prepared = self.prepare(cancel).await?;
        self.write(prepared).await
    }

    /// Walk, split and emit without touching the output directory.
    pub async fn prepare(&self, cancel: Option<CancelToken>) -> Result<PreparedBuild> {
        let started = Instant::now();
        let mut diagnostics = std::mem::take(&mut *self.pending.lock());

        if let Err(err) = self.cache.evict_stale() {
            tracing::warn!(error = %err, "cache eviction failed");
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::CacheCorruption,
                format!("stale cache entries could not be evicted: {err}"),
            ));
        }

        let mut builder = GraphBuilder::new(&self.options, &self.root, Arc::clone(&self.runtime))?
            .with_cache(Arc::clone(&self.cache) as Arc<dyn TransformCache>);
        if let Some(token) = &cancel {
            builder = builder.with_cancellation(token.clone());
        }
        let mut built = builder.build(&self.options.entries).await?;
        diagnostics.append(&mut built.diagnostics);
        ensure_current(cancel.as_ref())?;

        let chunks = split(&built.graph, &built.entries, self.options.split_strategy);
        let assets = self.emitter().await?.emit(&chunks, &built.graph)?;
        ensure_current(cancel.as_ref())?;

        Ok(PreparedBuild {
            started,
            built,
            chunks,
            assets,
            diagnostics,
        })
    }

    /// Write a prepared build and commit its transforms to the cache.
    pub async fn write(&self, prepared: PreparedBuild) -> Result<BuildResult> {
        let PreparedBuild {
            started,
            built,
            chunks,
            assets,
            mut diagnostics,
        } = prepared;

        let written = if self.write {
            let dir = self.output_dir();
            if self.options.clean {
                clean_dir(&dir, self.runtime.as_ref()).await?;
            }
            write_assets(&assets, &dir, self.runtime.as_ref(), true).await?
        } else {
            Vec::new()
        };

        if let Err(err) = self.cache.commit(built.fresh_entries, &built.graph.module_ids()) {
            tracing::warn!(error = %err, "failed to persist transform cache");
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::CacheCorruption,
                format!("transform cache was not saved: {err}"),
            ));
        }

        let stats = BuildStats {
            modules: built.graph.len(),
            chunks: chunks.len(),
            assets: assets.len(),
            transformed: built.transformed.len(),
            cache_hits: built.cache_hits,
            total_bytes: assets.iter().map(|a| a.size() as u64).sum(),
            duration: started.elapsed(),
        };
        tracing::info!(
            modules = stats.modules,
            chunks = stats.chunks,
            assets = stats.assets,
            transformed = stats.transformed,
            cache_hits = stats.cache_hits,
            duration_ms = stats.duration.as_millis() as u64,
            "build finished"
        );

        Ok(BuildResult {
            graph: built.graph,
            entries: built.entries,
            chunks,
            assets,
            written,
            diagnostics,
            transformed: built.transformed,
            stats,
        })
    }

    async fn emitter(&self) -> Result<Emitter> {
        let options = EmitOptions::from_bundle(&self.options, &self.root).with_hot(self.hot);
        let mut emitter = Emitter::new(options)?;

        let template = self.options.html.as_ref().and_then(|html| html.template.as_ref());
        if let Some(template) = template {
            let path = if template.is_absolute() {
                template.clone()
            } else {
                self.root.join(template)
            };
            let bytes = self
                .runtime
                .read_file(&path)
                .await
                .map_err(|source| EmitError::Io { path: path.clone(), source })?;
            emitter = emitter.with_html_template(String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(emitter)
    }
}

fn ensure_current(cancel: Option<&CancelToken>) -> Result<()> {
    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(GraphError::Cancelled.into());
    }
    Ok(())
}

/// Build `config.bundle` once, rooted at the runtime's working directory.
pub async fn build(config: &BaleConfig, runtime: Arc<dyn Runtime>) -> Result<BuildResult> {
    let root = runtime.get_cwd().map_err(Error::Runtime)?;
    Bundler::new(config.bundle_options(), root, runtime)?.build().await
}
