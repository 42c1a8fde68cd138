//! Logging setup for the bale CLI.
//!
//! Verbosity follows the global flags: `--verbose` turns on debug output for
//! the bale crates, `--quiet` keeps errors only, and otherwise `RUST_LOG`
//! applies with an info-level fallback. The subscriber is installed before
//! configuration is read, so `settings.log_level` is applied afterwards
//! through a reloadable filter, and only when neither the flags nor
//! `RUST_LOG` chose a level.

use std::sync::OnceLock;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

const VERBOSE_FILTER: &str =
    "bale=debug,bale_cli=debug,bale_bundler=debug,bale_analysis=debug,bale_graph=debug,bale_config=debug";
const DEFAULT_FILTER: &str = "bale=info,bale_cli=info,bale_bundler=info,bale_analysis=warn";
const QUIET_FILTER: &str = "error";

const BALE_TARGETS: [&str; 6] = ["bale", "bale_cli", "bale_bundler", "bale_analysis", "bale_graph", "bale_config"];

struct InstalledFilter {
    handle: reload::Handle<EnvFilter, Registry>,
    /// Flags or `RUST_LOG` already decided the level
    pinned: bool,
}

static FILTER: OnceLock<InstalledFilter> = OnceLock::new();

/// Filter for the given flags. `verbose` wins over `quiet`.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Filter putting every bale crate at `level`, or `None` when `level` is
/// not a level name.
pub fn configured_filter(level: &str) -> Option<EnvFilter> {
    let level: LevelFilter = level.trim().parse().ok()?;
    let level = level.to_string().to_lowercase();
    let directives: Vec<String> = BALE_TARGETS.iter().map(|target| format!("{target}={level}")).collect();
    EnvFilter::try_new(directives.join(",")).ok()
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .with_writer(std::io::stderr)
        .compact();

    let (filter, handle) = reload::Layer::new(filter_for(verbose, quiet));
    tracing_subscriber::registry().with(filter).with(fmt_layer).init();

    let pinned = verbose || quiet || std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let _ = FILTER.set(InstalledFilter { handle, pinned });
}

/// Apply `settings.log_level` from configuration.
///
/// A no-op when no subscriber was installed or its level is pinned.
pub fn apply_configured_level(level: Option<&str>) {
    let (Some(level), Some(installed)) = (level, FILTER.get()) else {
        return;
    };
    if installed.pinned {
        return;
    }

    match configured_filter(level) {
        Some(filter) => {
            if let Err(err) = installed.handle.reload(filter) {
                tracing::warn!(error = %err, "could not apply configured log level");
            }
        }
        None => tracing::warn!(level, "ignoring invalid settings.log_level"),
    }
}
