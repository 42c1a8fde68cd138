//! `bale build`: one-shot build of the configured entries.

use std::sync::Arc;

use bale_bundler::Bundler;
use bale_config::validate_fs;
use bale_graph::NativeRuntime;

use crate::cli::BuildArgs;
use crate::commands::{report_diagnostics, summary_rows};
use crate::config::{self, Overrides};
use crate::error::Result;
use crate::ui;

/// Load configuration, build, write the output directory and print a
/// summary. Diagnostics of a failed build are printed before the error is
/// returned.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let overrides = Overrides {
        entries: args.entries.clone(),
        output_dir: args.out_dir.clone(),
        tolerant: args.tolerant,
        minify: args.minify,
        clean: args.clean,
        no_cache: args.no_cache,
        worker_count: args.jobs.map(usize::from),
        ..Default::default()
    };
    let loaded = config::load(&args.config, Some(args.config.profile_or("production")), &overrides)?;
    let options = loaded.config.bundle_options();
    validate_fs(&options, &loaded.root)?;

    if let Some(source) = &loaded.source {
        tracing::debug!(config = %source.display(), "using config file");
    }
    let large_asset_bytes = options.large_asset_bytes;
    let output_dir = options.output_dir.clone();

    let spinner = ui::Spinner::new(&format!("Building {} entries...", options.entries.len()));
    let bundler = Bundler::new(options, &loaded.root, Arc::new(NativeRuntime))?;
    let result = match bundler.build().await {
        Ok(result) => result,
        Err(err) => {
            spinner.clear();
            report_diagnostics(err.diagnostics());
            return Err(err.into());
        }
    };
    spinner.clear();

    report_diagnostics(&result.diagnostics);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.stats)?);
    } else {
        ui::print_build_summary(&summary_rows(&result, large_asset_bytes), result.stats.duration);
    }

    ui::success(&format!(
        "Built {} modules into {} ({} from cache) in {}",
        result.stats.modules,
        output_dir.display(),
        result.stats.cache_hits,
        ui::format_duration(result.stats.duration)
    ));
    Ok(())
}
