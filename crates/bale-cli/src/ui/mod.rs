//! Terminal output: status lines, the spinner and the build summary.
//!
//! Everything here writes to stderr so `--json` output on stdout stays
//! machine-readable.

mod format;
mod messages;
mod spinner;

use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{format_duration, format_size, print_build_summary, SummaryRow};
pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Silence everything but errors.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub(crate) fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Whether running under a CI service.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Respects `NO_COLOR` and `FORCE_COLOR`, then asks the terminal.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Apply the color decision to every writer.
pub fn init_colors() {
    let enabled = should_use_color();
    owo_colors::set_override(enabled);
    console::set_colors_enabled_stderr(enabled);
}

/// Disable colors regardless of the environment.
pub fn disable_colors() {
    owo_colors::set_override(false);
    console::set_colors_enabled_stderr(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn no_color_beats_force_color() {
        unsafe {
            std::env::set_var("NO_COLOR", "1");
            std::env::set_var("FORCE_COLOR", "1");
        }
        assert!(!should_use_color());
        unsafe {
            std::env::remove_var("NO_COLOR");
        }
        assert!(should_use_color());
        unsafe {
            std::env::remove_var("FORCE_COLOR");
        }
    }

    #[test]
    #[serial]
    fn detects_ci() {
        unsafe { std::env::set_var("GITLAB_CI", "true") };
        assert!(is_ci());
        unsafe { std::env::remove_var("GITLAB_CI") };
    }
}
