// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the serve and versions subcommands and their arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use updater::registry::Channel;

#[derive(Parser)]
#[command(name = "updater")]
#[command(about = "Update and rollback sidecar for a single compose-managed container")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// YAML configuration file; environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the control API until interrupted
    Serve,

    /// List available application versions
    Versions {
        /// Where to look for versions
        #[arg(short, long, value_enum, default_value_t = Source::Releases)]
        source: Source,

        /// Print only the latest version on this channel
        #[arg(long, value_parser = parse_channel)]
        channel: Option<Channel>,

        /// Maximum number of versions to list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// GitHub repository (owner/name); derived from a ghcr.io image by default
        #[arg(long)]
        repo: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// GitHub releases
    Releases,
    /// Image tags from the registry
    Tags,
}

fn parse_channel(s: &str) -> Result<Channel, String> {
    s.parse()
}
