//! Conversion from CLI errors to miette reports.

use miette::Report;

use crate::error::CliError;

/// Convert a [`CliError`] into a report for `main`.
///
/// Bundler errors already implement `miette::Diagnostic` and pass through
/// unchanged; everything else gets its hint as help text.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(err) => Report::new(err),
        other => match other.hint() {
            Some(hint) => miette::miette!(help = hint, "{}", other),
            None => miette::miette!("{}", other),
        },
    }
}
