//! Development sessions: rebuild on change, announce module replacement.
//!
//! A session owns a [`Bundler`] on a background task. The host feeds it
//! [`ChangeEvent`]s (usually from a file watcher) and reads
//! [`SessionEvent`]s back:
//!
//! 1. the initial build is reported as [`SessionEvent::Built`];
//! 2. changes arriving within the debounce window form one batch;
//! 3. each changed file's cache entry is invalidated, and every module that
//!    imports it at any depth is marked stale;
//! 4. a batch arriving while a rebuild prepares cancels that rebuild and is
//!    merged into the next one; the cancelled build commits nothing. Once a
//!    build starts writing it finishes, and changes wait for the next cycle;
//! 5. a completed rebuild is reported with its [`HmrUpdate`], a failed one as
//!    [`SessionEvent::BuildFailed`]. Neither ends the session, and the
//!    modules a failed rebuild covered are reported with the next one.

pub mod acceptors;
pub mod state;

pub use acceptors::{AcceptorRegistry, HmrUpdate, compute_update};
pub use state::{InvalidTransition, ModuleState, ModuleStates};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bale_analysis::{CancellationSignal, Diagnostic};
use bale_config::{BaleConfig, DevConfig};
use bale_graph::{ModuleGraph, ModuleId, Runtime};
use indexmap::IndexSet;
use parking_lot::Mutex;
use path_clean::PathClean;
use rustc_hash::FxHashSet;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::build::{BuildResult, Bundler, PreparedBuild};
use crate::cache::ChangeDetector;
use crate::{BuildError, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// One file changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Modified)
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Created)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Removed)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Acceptors registered before the session starts
    pub acceptors: AcceptorRegistry,
    /// Quiet period that closes a change batch
    pub debounce: Duration,
    /// Module replacement; when off every change asks for a full reload
    pub hot: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            acceptors: AcceptorRegistry::new(),
            debounce: Duration::from_millis(100),
            hot: true,
        }
    }
}

impl SessionOptions {
    pub fn from_config(dev: &DevConfig, root: &Path) -> Self {
        Self {
            acceptors: AcceptorRegistry::from_config(&dev.acceptors, root),
            debounce: Duration::from_millis(dev.debounce_ms),
            hot: dev.hot,
        }
    }
}

/// What a session reports.
#[derive(Debug)]
pub enum SessionEvent {
    /// The initial build completed
    Built(BuildResult),
    /// A change batch was rebuilt
    Rebuilt {
        result: BuildResult,
        /// Modules the batch touched, after path-to-module mapping
        changed: Vec<ModuleId>,
        update: HmrUpdate,
    },
    /// A build failed; the session waits for the next change
    BuildFailed {
        error: BuildError,
        diagnostics: Vec<Diagnostic>,
    },
}

/// Control side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    changes: mpsc::UnboundedSender<ChangeEvent>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    stop: watch::Sender<bool>,
    states: Arc<Mutex<ModuleStates>>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queue a change for the next rebuild.
    pub fn notify(&self, change: ChangeEvent) -> Result<()> {
        self.changes.send(change).map_err(|_| Error::SessionClosed)
    }

    /// Next event, or `None` once the session has ended.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn module_state(&self, id: &ModuleId) -> ModuleState {
        self.states.lock().get(id)
    }

    pub fn module_states(&self) -> ModuleStates {
        self.states.lock().clone()
    }

    /// End the session, abandoning any build in progress.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "session task ended abnormally");
        }
    }
}

/// Start a session for `config` rooted at the runtime's working directory.
///
/// Must be called from within a tokio runtime.
pub fn start_session(config: &BaleConfig, runtime: Arc<dyn Runtime>) -> Result<SessionHandle> {
    let root = runtime.get_cwd()?;
    let dev = config.dev.clone().unwrap_or_default();
    let options = SessionOptions::from_config(&dev, &root);
    let bundler = Bundler::new(config.bundle_options(), root, runtime)?.with_hot(options.hot);
    Ok(start_session_with(bundler, options))
}

/// Start a session driving `bundler`.
pub fn start_session_with(bundler: Bundler, options: SessionOptions) -> SessionHandle {
    let (change_tx, change_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let states = Arc::new(Mutex::new(ModuleStates::new()));

    let session = Session {
        bundler,
        options,
        signal: CancellationSignal::new(),
        states: Arc::clone(&states),
        graph: None,
        carried: IndexSet::new(),
        events: event_tx,
    };
    let task = tokio::spawn(session.run(change_rx, stop_rx));

    SessionHandle {
        changes: change_tx,
        events: event_rx,
        stop: stop_tx,
        states,
        task,
    }
}

struct Session {
    bundler: Bundler,
    options: SessionOptions,
    signal: CancellationSignal,
    states: Arc<Mutex<ModuleStates>>,
    /// Graph of the last completed build
    graph: Option<ModuleGraph>,
    /// Changed modules of failed rebuilds, not yet reported
    carried: IndexSet<ModuleId>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

enum Outcome {
    Prepared(Result<PreparedBuild>),
    Superseded,
    Stopped,
}

impl Session {
    async fn run(
        mut self,
        mut changes: mpsc::UnboundedReceiver<ChangeEvent>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut pending: Vec<ChangeEvent> = Vec::new();
        loop {
            if !self.cycle(&mut pending, &mut changes, &mut stop).await {
                break;
            }

            tokio::select! {
                _ = stop.changed() => break,
                change = changes.recv() => match change {
                    Some(change) => pending.push(change),
                    None => break,
                },
            }
            if !self.debounce(&mut pending, &mut changes, &mut stop).await {
                break;
            }
        }
        tracing::debug!("session stopped");
    }

    /// Build until a build finishes without being superseded. Returns
    /// `false` when the session should end.
    async fn cycle(
        &mut self,
        pending: &mut Vec<ChangeEvent>,
        changes: &mut mpsc::UnboundedReceiver<ChangeEvent>,
        stop: &mut watch::Receiver<bool>,
    ) -> bool {
        let initial = self.graph.is_none() && pending.is_empty();
        loop {
            let mut changed = self.carried.clone();
            changed.extend(self.apply_changes(pending));
            self.states.lock().begin_build();
            if !initial {
                tracing::info!(changes = pending.len(), modules = changed.len(), "rebuilding");
            }

            let outcome = {
                let build = self.bundler.prepare(Some(self.signal.token()));
                tokio::pin!(build);
                tokio::select! {
                    biased;
                    _ = stop.changed() => Outcome::Stopped,
                    change = changes.recv() => match change {
                        Some(change) => {
                            self.signal.advance();
                            pending.push(change);
                            Outcome::Superseded
                        }
                        None => Outcome::Stopped,
                    },
                    prepared = &mut build => Outcome::Prepared(prepared),
                }
            };

            let finished = match outcome {
                Outcome::Stopped => {
                    self.states.lock().abort_build();
                    return false;
                }
                Outcome::Superseded => {
                    tracing::debug!("rebuild superseded by newer changes");
                    self.states.lock().abort_build();
                    if !self.debounce(pending, changes, stop).await {
                        return false;
                    }
                    continue;
                }
                Outcome::Prepared(Err(err)) => Err(err),
                // Writing is never raced against new changes: they queue in
                // the channel until the next cycle.
                Outcome::Prepared(Ok(prepared)) => self.bundler.write(prepared).await,
            };

            match finished {
                Err(err) if err.is_cancelled() => {
                    self.states.lock().abort_build();
                }
                Err(error) => {
                    tracing::warn!(error = %error, "build failed");
                    self.states.lock().abort_build();
                    pending.clear();
                    if !initial {
                        self.carried = changed;
                    }
                    let diagnostics = error.diagnostics().to_vec();
                    let _ = self.events.send(SessionEvent::BuildFailed { error, diagnostics });
                    return true;
                }
                Ok(result) => {
                    self.states.lock().finish_build(&result.graph.module_ids());
                    self.graph = Some(result.graph.clone());
                    pending.clear();
                    self.carried.clear();

                    let event = if initial {
                        SessionEvent::Built(result)
                    } else {
                        let changed: Vec<ModuleId> = changed.into_iter().collect();
                        let update =
                            compute_update(&result.graph, &changed, &self.options.acceptors, self.options.hot);
                        tracing::info!(
                            accepted = update.accepted_modules.len(),
                            full_reload = update.requires_full_reload,
                            "rebuild finished"
                        );
                        SessionEvent::Rebuilt {
                            result,
                            changed,
                            update,
                        }
                    };
                    let _ = self.events.send(event);
                    return true;
                }
            }
        }
    }

    /// Collect changes until the debounce window passes quietly.
    async fn debounce(
        &self,
        pending: &mut Vec<ChangeEvent>,
        changes: &mut mpsc::UnboundedReceiver<ChangeEvent>,
        stop: &mut watch::Receiver<bool>,
    ) -> bool {
        loop {
            tokio::select! {
                _ = stop.changed() => return false,
                next = tokio::time::timeout(self.options.debounce, changes.recv()) => match next {
                    Ok(Some(change)) => pending.push(change),
                    Ok(None) => return false,
                    Err(_) => return true,
                },
            }
        }
    }

    /// Invalidate the cache entries of changed files and mark their
    /// importers stale. Returns the changed modules.
    fn apply_changes(&self, pending: &[ChangeEvent]) -> IndexSet<ModuleId> {
        let root = self.bundler.root();
        let mut changed: IndexSet<ModuleId> = IndexSet::new();

        for change in pending {
            let path = absolute(root, &change.path);
            let known: Vec<ModuleId> = self
                .graph
                .as_ref()
                .map(|graph| {
                    graph
                        .module_ids()
                        .into_iter()
                        .filter(|id| id.path() == path)
                        .collect()
                })
                .unwrap_or_default();

            if known.is_empty() {
                changed.insert(ModuleId::new(&path));
            } else {
                changed.extend(known);
            }
        }

        for id in &changed {
            self.bundler.cache().invalidate(id);
        }

        if let Some(graph) = &self.graph {
            let seeds: FxHashSet<ModuleId> = changed.iter().cloned().collect();
            let affected = ChangeDetector::new().compute_affected(&seeds, graph);
            let marked = self.states.lock().mark_stale(affected.iter());
            tracing::debug!(changed = changed.len(), stale = marked, "applied changes");
        }
        changed
    }
}

fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        root.join(path).clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_config::BundleOptions;
    use bale_graph::MemoryRuntime;

    fn chain(a_source: &str) -> Arc<MemoryRuntime> {
        Arc::new(MemoryRuntime::with_files(
            "/app",
            &[
                ("src/a.js", a_source),
                ("src/b.js", "import { c } from './c';\nexport const b = c + 1;\n"),
                ("src/c.js", "export const c = 1;\n"),
            ],
        ))
    }

    fn session(runtime: Arc<MemoryRuntime>) -> SessionHandle {
        let mut options = BundleOptions::default().with_entry("src/a.js");
        options.cache.enabled = false;
        let bundler = Bundler::new(options, "/app", runtime).unwrap().with_hot(true);
        start_session_with(
            bundler,
            SessionOptions {
                debounce: Duration::from_millis(10),
                ..SessionOptions::default()
            },
        )
    }

    async fn rebuilt(handle: &mut SessionHandle) -> (BuildResult, Vec<ModuleId>, HmrUpdate) {
        match handle.next_event().await {
            Some(SessionEvent::Rebuilt { result, changed, update }) => (result, changed, update),
            other => panic!("expected a rebuild, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn change_without_acceptor_requires_reload() {
        let runtime = chain("import { b } from './b';\nconsole.log(b);\n");
        let mut handle = session(runtime.clone());
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Built(_))));

        runtime.insert("/app/src/c.js", "export const c = 2;\n");
        handle.notify(ChangeEvent::modified("src/c.js")).unwrap();

        let (result, changed, update) = rebuilt(&mut handle).await;
        let c = ModuleId::new("/app/src/c.js");
        assert_eq!(changed, vec![c.clone()]);
        assert_eq!(result.transformed, vec![c.clone()]);
        assert!(update.requires_full_reload);
        assert_eq!(handle.module_state(&c), ModuleState::Built);
        handle.stop().await;
    }

    #[tokio::test]
    async fn acceptor_absorbs_the_change() {
        let runtime = chain(
            "import { b } from './b';\nconsole.log(b);\nif (module.hot) { module.hot.accept('./b', () => {}); }\n",
        );
        let mut handle = session(runtime.clone());
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Built(_))));

        runtime.insert("/app/src/c.js", "export const c = 3;\n");
        handle.notify(ChangeEvent::modified("/app/src/c.js")).unwrap();

        let (result, _, update) = rebuilt(&mut handle).await;
        assert_eq!(result.transformed, vec![ModuleId::new("/app/src/c.js")]);
        assert!(!update.requires_full_reload);
        assert_eq!(update.accepted_modules, vec![ModuleId::new("/app/src/a.js")]);
        handle.stop().await;
    }

    #[tokio::test]
    async fn burst_of_changes_is_one_rebuild() {
        let runtime = chain("import { b } from './b';\n");
        let mut handle = session(runtime.clone());
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Built(_))));

        runtime.insert("/app/src/b.js", "import { c } from './c';\nexport const b = c + 2;\n");
        runtime.insert("/app/src/c.js", "export const c = 5;\n");
        handle.notify(ChangeEvent::modified("src/b.js")).unwrap();
        handle.notify(ChangeEvent::modified("src/c.js")).unwrap();

        let (result, changed, _) = rebuilt(&mut handle).await;
        assert_eq!(changed.len(), 2);
        assert_eq!(result.transformed.len(), 2);
        handle.stop().await;
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_session_alive() {
        let runtime = chain("import { b } from './b';\n");
        let mut handle = session(runtime.clone());
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Built(_))));

        runtime.insert("/app/src/b.js", "import { c } from './missing';\n");
        handle.notify(ChangeEvent::modified("src/b.js")).unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::BuildFailed { .. })
        ));

        runtime.insert("/app/src/b.js", "import { c } from './c';\nexport const b = c;\n");
        handle.notify(ChangeEvent::modified("src/b.js")).unwrap();
        let (_, _, update) = rebuilt(&mut handle).await;
        assert!(update.requires_full_reload);
        handle.stop().await;
    }

    #[tokio::test]
    async fn failed_rebuild_changes_are_reported_with_the_next_one() {
        let runtime = chain("import { b } from './b';\n");
        let mut handle = session(runtime.clone());
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Built(_))));

        runtime.insert("/app/src/c.js", "export const c = 7;\n");
        runtime.insert("/app/src/b.js", "import { c } from './missing';\n");
        handle.notify(ChangeEvent::modified("src/c.js")).unwrap();
        handle.notify(ChangeEvent::modified("src/b.js")).unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::BuildFailed { .. })
        ));

        runtime.insert("/app/src/b.js", "import { c } from './c';\nexport const b = c;\n");
        handle.notify(ChangeEvent::modified("src/b.js")).unwrap();
        let (_, changed, _) = rebuilt(&mut handle).await;
        assert_eq!(
            changed,
            vec![ModuleId::new("/app/src/c.js"), ModuleId::new("/app/src/b.js")]
        );
        handle.stop().await;
    }

    #[tokio::test]
    async fn change_during_write_waits_for_the_write() {
        let runtime = chain("import { b } from './b';\nconsole.log(b);\n");
        let mut handle = session(runtime.clone());
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Built(_))));

        runtime.set_write_delay(Some(Duration::from_millis(50)));
        let writes = runtime.write_count();
        runtime.insert("/app/src/c.js", "export const c = 2;\n");
        handle.notify(ChangeEvent::modified("src/c.js")).unwrap();
        while runtime.write_count() == writes {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        runtime.insert("/app/src/b.js", "import { c } from './c';\nexport const b = c * 2;\n");
        handle.notify(ChangeEvent::modified("src/b.js")).unwrap();

        let (first, changed, _) = rebuilt(&mut handle).await;
        assert_eq!(changed, vec![ModuleId::new("/app/src/c.js")]);
        assert_eq!(first.written.len(), first.assets.len());

        let (second, changed, _) = rebuilt(&mut handle).await;
        assert_eq!(changed, vec![ModuleId::new("/app/src/b.js")]);
        for (asset, path) in second.assets.iter().zip(&second.written) {
            assert_eq!(runtime.get(path).as_deref(), Some(asset.content.as_slice()));
        }
        handle.stop().await;
    }

    #[tokio::test]
    async fn notify_after_stop_is_rejected() {
        let mut handle = session(chain("export const a = 1;\n"));
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Built(_))));
        let changes = handle.changes.clone();
        handle.stop().await;
        assert!(changes.send(ChangeEvent::modified("src/a.js")).is_err());
    }
}
