//! Command implementations.

mod build;
mod check;
mod dev;

pub use build::execute as build_execute;
pub use check::execute as check_execute;
pub use dev::execute as dev_execute;

use bale_bundler::{AssetRole, BuildResult, Diagnostic, Severity};

use crate::ui::{self, SummaryRow};

/// Print each diagnostic as a warning or error line.
pub(crate) fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let mut line = diagnostic.to_string();
        if let Some(help) = &diagnostic.help {
            line.push_str(&format!("\n    help: {help}"));
        }
        match diagnostic.severity {
            Severity::Error => ui::error(&line),
            Severity::Warning => ui::warning(&line),
        }
    }
}

/// Summary rows for every emitted file, in emission order.
pub(crate) fn summary_rows(result: &BuildResult, large_asset_bytes: u64) -> Vec<SummaryRow> {
    result
        .assets
        .iter()
        .map(|asset| {
            let size = asset.size() as u64;
            SummaryRow {
                filename: asset.path().to_string(),
                kind: match asset.role {
                    AssetRole::Script => "script",
                    AssetRole::Style => "style",
                    AssetRole::SourceMap => "map",
                    AssetRole::Asset => "asset",
                    AssetRole::Html => "html",
                },
                size,
                large: asset.role != AssetRole::SourceMap && size > large_asset_bytes,
            }
        })
        .collect()
}
