//! Spinner for work without a known length.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::{OwoColorize, Stream::Stderr};
use std::time::Duration;

/// Spinner shown while a build runs. Hidden in CI, in quiet mode and when
/// stderr is not a terminal.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if super::is_quiet() || super::is_ci() || !console::user_attended_stderr() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["◐", "◓", "◑", "◒"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    pub fn finish(&self, message: &str) {
        self.pb.finish_with_message(format!("{} {}", "✓".if_supports_color(Stderr, |t| t.green()), message));
    }

    /// Remove the spinner line entirely.
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}
