//! File system watcher for dev sessions.
//!
//! Forwards raw notify events as [`ChangeEvent`]s. Batching bursts of
//! changes is the session's job, so nothing is debounced here.

use std::path::{Path, PathBuf};

use bale_bundler::ChangeEvent;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

/// Watches a set of directories under the project root.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `paths` (the root itself when empty) recursively.
    ///
    /// Paths outside `root`, hidden files and paths containing one of the
    /// `ignore` fragments are dropped.
    pub fn new(
        root: PathBuf,
        paths: &[PathBuf],
        ignore: Vec<String>,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(256);
        let filter_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "file watcher error");
                    return;
                }
            };
            for path in event.paths {
                if should_ignore(&path, &filter_root, &ignore) {
                    continue;
                }
                let change = match event.kind {
                    EventKind::Create(_) => ChangeEvent::created(path),
                    EventKind::Modify(_) => ChangeEvent::modified(path),
                    EventKind::Remove(_) => ChangeEvent::removed(path),
                    _ => continue,
                };
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })?;

        let targets: Vec<PathBuf> = if paths.is_empty() {
            vec![root.clone()]
        } else {
            paths
                .iter()
                .map(|path| if path.is_absolute() { path.clone() } else { root.join(path) })
                .collect()
        };
        for target in &targets {
            if !target.exists() {
                return Err(CliError::FileNotFound(target.clone()));
            }
            watcher.watch(target, RecursiveMode::Recursive)?;
            tracing::debug!(path = %target.display(), "watching");
        }

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Whether a change at `path` should be dropped.
///
/// A pattern starting with `*` matches a suffix (`*.log`); any other pattern
/// matches a leading path fragment of the path relative to `root`, or a
/// fragment starting at any directory boundary.
pub fn should_ignore(path: &Path, root: &Path, patterns: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };

    let hidden = relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    });
    if hidden {
        return true;
    }

    let relative = relative.to_string_lossy().replace('\\', "/");
    patterns.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix('*') {
            return relative.ends_with(suffix);
        }
        let pattern = pattern.trim_end_matches('/');
        !pattern.is_empty()
            && (relative == pattern
                || relative.starts_with(&format!("{pattern}/"))
                || relative.contains(&format!("/{pattern}/"))
                || relative.ends_with(&format!("/{pattern}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ignores_configured_directories() {
        let root = Path::new("/project");
        let ignore = patterns(&["node_modules", "dist"]);
        assert!(should_ignore(Path::new("/project/node_modules/pkg/index.js"), root, &ignore));
        assert!(should_ignore(Path::new("/project/packages/a/node_modules/x.js"), root, &ignore));
        assert!(should_ignore(Path::new("/project/dist/static/js/main.js"), root, &ignore));
        assert!(!should_ignore(Path::new("/project/src/distance.js"), root, &ignore));
        assert!(!should_ignore(Path::new("/project/src/main.js"), root, &ignore));
    }

    #[test]
    fn ignores_suffix_patterns() {
        let root = Path::new("/project");
        let ignore = patterns(&["*.log"]);
        assert!(should_ignore(Path::new("/project/debug.log"), root, &ignore));
        assert!(!should_ignore(Path::new("/project/src/log.js"), root, &ignore));
    }

    #[test]
    fn ignores_hidden_and_outside_paths() {
        let root = Path::new("/project");
        assert!(should_ignore(Path::new("/project/.git/HEAD"), root, &[]));
        assert!(should_ignore(Path::new("/project/src/.cache/x.js"), root, &[]));
        assert!(should_ignore(Path::new("/elsewhere/x.js"), root, &[]));
    }

    #[test]
    fn missing_watch_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = FileWatcher::new(dir.path().to_path_buf(), &[PathBuf::from("nope")], vec![]);
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn reports_writes_under_the_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("src")).unwrap();
        let (_watcher, mut changes) = FileWatcher::new(root.clone(), &[], vec![]).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(root.join("src/main.js"), "console.log(1);\n").unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .expect("no change reported")
            .unwrap();
        assert_eq!(change.path, root.join("src/main.js"));
    }
}
