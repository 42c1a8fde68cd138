//! Frontier-parallel module graph construction.
//!
//! Entry points form frontier 0. For every frontier the coordinator:
//!
//! 1. has already claimed each identity in the dedup table,
//! 2. dispatches one worker per module onto a `JoinSet`, bounded by a
//!    semaphore of `worker_count` permits,
//! 3. waits for the whole frontier,
//! 4. merges results in frontier order, claiming newly discovered identities
//!    for the next frontier in declaration order.
//!
//! Only the coordinator touches the dedup table and the graph, so discovery
//! order is deterministic regardless of worker scheduling.

pub mod cache;
pub mod cancel;
mod worker;

pub use cache::{CACHE_FORMAT_VERSION, CachedTransform, Fingerprint, TransformCache};
pub use cancel::{CancelToken, CancellationSignal};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bale_config::{BundleOptions, ConfigError, UnresolvedPolicy};
use bale_graph::{DependencyEdge, ModuleGraph, ModuleId, Runtime, RuntimeError};
use rustc_hash::FxHashSet;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::resolver::{ResolveError, ResolveResult, Resolver, ResolverOptions};
use crate::transform::{RuleSet, RunOptions, TransformError};
use worker::{Processed, WorkerContext, process_module};

/// One reason a build produced no output.
#[derive(Debug, Clone)]
pub enum BuildFailure {
    Read {
        module: ModuleId,
        error: RuntimeError,
    },
    Transform(TransformError),
    Resolution {
        importer: ModuleId,
        error: ResolveError,
    },
}

impl BuildFailure {
    pub fn module(&self) -> &ModuleId {
        match self {
            BuildFailure::Read { module, .. } => module,
            BuildFailure::Transform(err) => &err.module,
            BuildFailure::Resolution { importer, .. } => importer,
        }
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildFailure::Read { module, error } => write!(f, "cannot read {module}: {error}"),
            BuildFailure::Transform(err) => write!(f, "{err}"),
            BuildFailure::Resolution { importer, error } => write!(f, "{error} (in {importer})"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("no entry points configured")]
    NoEntries,

    #[error("entry point {} could not be resolved", entry.display())]
    UnresolvedEntry {
        entry: PathBuf,
        #[source]
        source: ResolveError,
    },

    #[error("{} module(s) failed to build", failures.len())]
    Failed {
        failures: Vec<BuildFailure>,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("build cancelled")]
    Cancelled,

    #[error("worker task failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Graph(#[from] bale_graph::Error),
}

/// A completed walk.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    pub graph: ModuleGraph,
    /// Resolved entry identities in declared order
    pub entries: Vec<ModuleId>,
    pub diagnostics: Vec<Diagnostic>,
    /// Transform results not yet committed to the cache
    pub fresh_entries: Vec<CachedTransform>,
    /// Modules whose chain actually ran during this walk
    pub transformed: Vec<ModuleId>,
    pub cache_hits: usize,
    pub frontiers: usize,
    pub duration: Duration,
}

/// Settings for one graph walk, all paths absolute.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub resolver: ResolverOptions,
    pub worker_count: usize,
    pub run: RunOptions,
    pub unresolved: UnresolvedPolicy,
    pub source_maps: bool,
}

impl GraphOptions {
    pub fn from_bundle(options: &BundleOptions, root: &Path) -> Self {
        Self {
            resolver: ResolverOptions::from_bundle(options, root),
            worker_count: options.effective_worker_count().max(1),
            run: RunOptions {
                step_timeout: options.step_timeout_ms.map(Duration::from_millis),
                large_asset_bytes: options.large_asset_bytes,
            },
            unresolved: options.unresolved,
            source_maps: options.source_maps,
        }
    }
}

/// Builds a [`ModuleGraph`] from entry points.
#[derive(Debug)]
pub struct GraphBuilder {
    ctx: Arc<WorkerContext>,
    worker_count: usize,
    unresolved: UnresolvedPolicy,
    cancel: Option<CancelToken>,
}

impl GraphBuilder {
    /// Builder for `options` anchored at `root`; fails if a rule pattern
    /// does not compile.
    pub fn new(
        options: &BundleOptions,
        root: &Path,
        runtime: Arc<dyn Runtime>,
    ) -> Result<Self, ConfigError> {
        let rules = RuleSet::compile(options)?;
        Ok(Self::with_options(
            GraphOptions::from_bundle(options, root),
            rules,
            runtime,
        ))
    }

    pub fn with_options(options: GraphOptions, rules: RuleSet, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            ctx: Arc::new(WorkerContext {
                resolver: Resolver::new(options.resolver),
                rules,
                runtime,
                cache: None,
                run: options.run,
                source_maps: options.source_maps,
            }),
            worker_count: options.worker_count.max(1),
            unresolved: options.unresolved,
            cancel: None,
        }
    }

    /// Consult `cache` before running transform chains.
    pub fn with_cache(mut self, cache: Arc<dyn TransformCache>) -> Self {
        if let Some(ctx) = Arc::get_mut(&mut self.ctx) {
            ctx.cache = Some(cache);
        }
        self
    }

    /// Abort the walk once `token`'s generation is superseded.
    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Walk the graph from `entries` (relative to the project root).
    pub async fn build(&self, entries: &[PathBuf]) -> Result<BuildGraph, GraphError> {
        if entries.is_empty() {
            return Err(GraphError::NoEntries);
        }
        let started = Instant::now();
        let runtime = self.ctx.runtime.as_ref();

        let mut entry_ids: Vec<ModuleId> = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = self
                .ctx
                .resolver
                .resolve_entry(entry, runtime)
                .await
                .map_err(|source| GraphError::UnresolvedEntry {
                    entry: entry.clone(),
                    source,
                })?;
            if !entry_ids.contains(&id) {
                entry_ids.push(id);
            }
        }

        let entry_set: FxHashSet<ModuleId> = entry_ids.iter().cloned().collect();
        let mut claimed = entry_set.clone();
        let mut frontier = entry_ids.clone();

        let graph = ModuleGraph::new();
        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut pending_edges: Vec<DependencyEdge> = Vec::new();
        let mut failures: Vec<BuildFailure> = Vec::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut fresh_entries = Vec::new();
        let mut transformed = Vec::new();
        let mut cache_hits = 0;
        let mut frontiers = 0;

        while !frontier.is_empty() {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Err(GraphError::Cancelled);
            }
            tracing::debug!(depth = frontiers, modules = frontier.len(), "processing frontier");

            let results = self.run_frontier(&semaphore, &frontier, &entry_set).await?;
            let mut next: Vec<ModuleId> = Vec::new();

            for (id, result) in frontier.iter().zip(results) {
                let processed = match result {
                    Ok(processed) => processed,
                    Err(failure) => {
                        failures.push(failure);
                        continue;
                    }
                };

                match processed.fresh {
                    Some(entry) => {
                        transformed.push(id.clone());
                        fresh_entries.push(entry);
                    }
                    None => cache_hits += 1,
                }
                diagnostics.extend(processed.diagnostics);

                for (dep, resolution) in processed.resolved {
                    match resolution {
                        Ok(ResolveResult::Local(target)) => {
                            if claimed.insert(target.clone()) {
                                next.push(target.clone());
                            }
                            pending_edges.push(DependencyEdge::new(
                                id.clone(),
                                dep.specifier,
                                target,
                                dep.kind,
                            ));
                        }
                        Ok(ResolveResult::External(specifier)) => {
                            graph.add_external(specifier, id.clone());
                        }
                        Err(error) => match self.unresolved {
                            UnresolvedPolicy::Strict => failures.push(BuildFailure::Resolution {
                                importer: id.clone(),
                                error,
                            }),
                            UnresolvedPolicy::Tolerant => {
                                tracing::warn!(importer = %id, specifier = error.specifier(), "dropping unresolved import");
                                diagnostics.push(
                                    Diagnostic::warning(DiagnosticKind::ResolutionError, error.to_string())
                                        .with_module(id.clone())
                                        .with_help(format!("tried {} path(s)", error.tried().len())),
                                );
                            }
                        },
                    }
                }

                graph.add_module(processed.module)?;
            }

            frontier = next;
            frontiers += 1;
        }

        if !failures.is_empty() {
            return Err(GraphError::Failed {
                failures,
                diagnostics,
            });
        }

        for edge in pending_edges {
            graph.add_edge(edge)?;
        }

        let duration = started.elapsed();
        tracing::debug!(
            modules = graph.len(),
            transformed = transformed.len(),
            cache_hits,
            ?duration,
            "graph complete"
        );

        Ok(BuildGraph {
            graph,
            entries: entry_ids,
            diagnostics,
            fresh_entries,
            transformed,
            cache_hits,
            frontiers,
            duration,
        })
    }

    /// Process one frontier; results come back in frontier order.
    async fn run_frontier(
        &self,
        semaphore: &Arc<Semaphore>,
        frontier: &[ModuleId],
        entries: &FxHashSet<ModuleId>,
    ) -> Result<Vec<Result<Processed, BuildFailure>>, GraphError> {
        let mut tasks = JoinSet::new();
        for (idx, id) in frontier.iter().enumerate() {
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(semaphore);
            let is_entry = entries.contains(id);
            let id = id.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (idx, process_module(&ctx, id, is_entry).await)
            });
        }

        let mut slots: Vec<Option<Result<Processed, BuildFailure>>> =
            (0..frontier.len()).map(|_| None).collect();
        let mut cancel = self.cancel.clone();

        loop {
            let joined = match cancel.as_mut() {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tasks.abort_all();
                        tracing::debug!("walk cancelled mid-frontier");
                        return Err(GraphError::Cancelled);
                    }
                    joined = tasks.join_next() => joined,
                },
                None => tasks.join_next().await,
            };

            let Some(joined) = joined else { break };
            let (idx, result) = joined.map_err(|e| GraphError::Worker(e.to_string()))?;
            slots[idx] = Some(result);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
