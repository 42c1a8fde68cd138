//! `bale check`: load and validate configuration without building.

use bale_config::{parse_template, validate_fs};

use crate::cli::CheckArgs;
use crate::config::{self, Overrides};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: CheckArgs) -> Result<()> {
    let loaded = config::load(&args.config, args.config.profile.as_deref(), &Overrides::default())?;
    let options = &loaded.config.bundle_options();

    validate_fs(options, &loaded.root)?;
    for (role, template) in options.filenames.iter() {
        parse_template(role, template)?;
    }
    if let Some(template) = options.html.as_ref().and_then(|html| html.template.as_ref()) {
        let path = loaded.root.join(template);
        if !path.is_file() {
            return Err(crate::error::CliError::FileNotFound(path));
        }
    }

    match &loaded.source {
        Some(source) => ui::info(&format!("Config: {}", source.display())),
        None => ui::info("Config: defaults (no config file found)"),
    }
    if let Some(profile) = &loaded.profile {
        ui::info(&format!("Profile: {profile}"));
    }
    ui::info(&format!(
        "Entries: {}",
        options
            .entries
            .iter()
            .map(|entry| entry.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    let rules: usize = options.rules.iter().map(|group| group.rules.len()).sum();
    ui::info(&format!("Rules: {} in {} groups", rules, options.rules.len()));
    ui::info(&format!("Output: {}", options.output_dir.display()));
    ui::success("Configuration is valid");
    Ok(())
}
