//! Command-line interface definition for bale.
//!
//! - `bale build` - one-shot build of the configured entries
//! - `bale dev` - watch the project and rebuild incrementally
//! - `bale check` - load and validate configuration without building

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, CheckArgs, Command, ConfigArgs, DevArgs};

/// bale - an asset bundler for web projects
#[derive(Parser, Debug)]
#[command(
    name = "bale",
    version,
    about = "Bundle scripts, styles and assets for the browser",
    long_about = "bale resolves a module graph from your entry points, runs each file through\n\
                  its transform rules, splits the graph into chunks and writes hashed\n\
                  assets to the output directory."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
