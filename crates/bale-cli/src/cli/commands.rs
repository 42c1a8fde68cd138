use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available bale subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the configured entries once
    ///
    /// Writes scripts, styles, assets and the HTML page (when configured)
    /// to the output directory. Nothing is written if any file fails.
    Build(BuildArgs),

    /// Watch the project and rebuild on change
    ///
    /// Keeps a session open: every batch of file changes rebuilds only the
    /// affected modules and reports whether the page can take the update in
    /// place or needs a full reload.
    Dev(DevArgs),

    /// Validate configuration
    ///
    /// Loads bale.toml with every override applied and checks entries, rules
    /// and filename templates without building.
    Check(CheckArgs),
}

/// Options shared by every command that loads configuration.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to the config file (defaults to bale.toml or package.json#bale)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root; relative paths in the config resolve against it
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Profile to apply on top of the base configuration
    ///
    /// Defaults to `production` for builds and `development` for dev sessions.
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,
}

impl ConfigArgs {
    pub fn profile_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.profile.as_deref().unwrap_or(default)
    }
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Entry points; replaces the configured entries when given
    #[arg(value_name = "ENTRY")]
    pub entries: Vec<String>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Report unresolved imports as warnings instead of failing
    #[arg(long)]
    pub tolerant: bool,

    /// Minify scripts and styles
    #[arg(long)]
    pub minify: bool,

    /// Remove the output directory before writing
    #[arg(long)]
    pub clean: bool,

    /// Skip the persistent transform cache
    #[arg(long)]
    pub no_cache: bool,

    /// Number of transform workers
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Print build statistics as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the dev command
#[derive(Args, Debug)]
pub struct DevArgs {
    /// Entry points; replaces the configured entries when given
    #[arg(value_name = "ENTRY")]
    pub entries: Vec<String>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Milliseconds to wait for a burst of changes to settle
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Treat every change as a full reload
    #[arg(long)]
    pub no_hot: bool,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}
