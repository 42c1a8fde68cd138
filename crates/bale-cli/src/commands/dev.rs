//! `bale dev`: keep a bundler session open and rebuild on change.
//!
//! The watcher feeds file changes into the session; the session batches
//! them, rebuilds what they affect and reports back whether the page can
//! take the update in place. Ctrl+C ends the session.

use std::path::Path;
use std::sync::Arc;

use bale_bundler::{Bundler, HmrUpdate, SessionEvent, SessionOptions, start_session_with};
use bale_config::validate_fs;
use bale_graph::{ModuleId, NativeRuntime};
use tokio::signal;

use crate::cli::DevArgs;
use crate::commands::report_diagnostics;
use crate::config::{self, Overrides};
use crate::dev::FileWatcher;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: DevArgs) -> Result<()> {
    let overrides = Overrides {
        entries: args.entries.clone(),
        debounce_ms: args.debounce,
        no_hot: args.no_hot,
        ..Default::default()
    };
    let loaded = config::load(&args.config, Some(args.config.profile_or("development")), &overrides)?;
    let root = loaded.root.clone();
    let options = loaded.config.bundle_options();
    validate_fs(&options, &root)?;

    let dev = loaded.config.dev.unwrap_or_default();
    let session_options = SessionOptions::from_config(&dev, &root);

    let mut ignore = dev.ignore.clone();
    ignore.push(options.output_dir.to_string_lossy().into_owned());

    ui::info(&format!(
        "Starting dev session for {} entries ({})",
        options.entries.len(),
        if session_options.hot { "hot updates" } else { "full reloads" }
    ));

    let bundler = Bundler::new(options, &root, Arc::new(NativeRuntime))?.with_hot(session_options.hot);
    let mut session = start_session_with(bundler, session_options);
    let (_watcher, mut changes) = FileWatcher::new(root.clone(), &dev.watch_paths, ignore)?;

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(change) = changes.recv() => {
                tracing::debug!(path = %change.path.display(), kind = ?change.kind, "file changed");
                session.notify(change)?;
            }

            event = session.next_event() => match event {
                Some(event) => report_event(&event, &root),
                None => {
                    ui::warning("Session ended unexpectedly");
                    break;
                }
            },

            _ = &mut shutdown => {
                ui::info("Stopping dev session...");
                break;
            }
        }
    }

    session.stop().await;
    ui::success("Dev session stopped");
    Ok(())
}

fn report_event(event: &SessionEvent, root: &Path) {
    match event {
        SessionEvent::Built(result) => {
            report_diagnostics(&result.diagnostics);
            ui::success(&format!(
                "Built {} modules in {}",
                result.stats.modules,
                ui::format_duration(result.stats.duration)
            ));
        }
        SessionEvent::Rebuilt {
            result,
            changed,
            update,
        } => {
            report_diagnostics(&result.diagnostics);
            ui::success(&format!(
                "Rebuilt {} of {} modules in {}",
                result.transformed.len(),
                result.stats.modules,
                ui::format_duration(result.stats.duration)
            ));
            ui::info(&describe_update(update, changed, root));
        }
        SessionEvent::BuildFailed { error, diagnostics } => {
            report_diagnostics(diagnostics);
            ui::error(&format!("Build failed: {error}"));
            ui::info("Waiting for changes...");
        }
    }
}

/// One line describing how a rebuild reaches the page.
pub(crate) fn describe_update(update: &HmrUpdate, changed: &[ModuleId], root: &Path) -> String {
    let names = |ids: &[ModuleId]| {
        ids.iter()
            .map(|id| {
                id.path()
                    .strip_prefix(root)
                    .unwrap_or(id.path())
                    .display()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    if changed.is_empty() {
        "No modules affected".to_string()
    } else if update.requires_full_reload {
        format!("Full reload: {} not accepted", names(changed))
    } else {
        format!(
            "Hot update: {} accepted by {}",
            names(changed),
            names(&update.accepted_modules)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> ModuleId {
        ModuleId::new(path)
    }

    #[test]
    fn describes_hot_updates_relative_to_root() {
        let update = HmrUpdate {
            accepted_modules: vec![id("/app/src/main.js")],
            updated_modules: vec![id("/app/src/count.js")],
            requires_full_reload: false,
        };
        let line = describe_update(&update, &[id("/app/src/count.js")], Path::new("/app"));
        insta::assert_snapshot!(line, @"Hot update: src/count.js accepted by src/main.js");
    }

    #[test]
    fn describes_full_reloads() {
        let update = HmrUpdate {
            accepted_modules: vec![],
            updated_modules: vec![id("/app/src/main.js")],
            requires_full_reload: true,
        };
        let line = describe_update(&update, &[id("/app/src/main.js")], Path::new("/app"));
        insta::assert_snapshot!(line, @"Full reload: src/main.js not accepted");
    }

    #[test]
    fn empty_change_sets_touch_nothing() {
        let line = describe_update(&HmrUpdate::default(), &[], Path::new("/app"));
        assert_eq!(line, "No modules affected");
    }
}
