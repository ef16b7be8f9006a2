// ABOUTME: Entry point for the updater sidecar.
// ABOUTME: Parses arguments and dispatches to the serve and versions commands.

mod cli;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands, Source};
use tracing_subscriber::EnvFilter;
use updater::config::Config;
use updater::deploy::{Collaborators, Orchestrator, StateStore};
use updater::error::{Error, Result};
use updater::registry::{self, Channel, Release, ReleaseClient, Tag, TagClient};
use updater::server;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_sources(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Versions {
            source,
            channel,
            limit,
            repo,
        } => match source {
            Source::Releases => list_releases(&config, repo, channel, limit).await,
            Source::Tags => list_tags(&config, channel, limit).await,
        },
    }
}

async fn serve(config: Config) -> Result<()> {
    let config = Arc::new(config);
    tracing::info!(
        listen = %config.listen_addr,
        working_dir = %config.working_dir.display(),
        service = %config.service,
        runtime = %config.runtime,
        "starting updater"
    );

    let collaborators = Collaborators::production(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&config),
        Arc::new(StateStore::new()),
        collaborators,
    ));

    server::serve(&config, orchestrator).await
}

async fn list_releases(
    config: &Config,
    repo: Option<String>,
    channel: Option<Channel>,
    limit: usize,
) -> Result<()> {
    let repo = repo
        .or_else(|| registry::github_repo_of(&config.image_repo))
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "cannot derive a GitHub repository from {}; pass --repo",
                config.image_repo
            ))
        })?;
    let client = ReleaseClient::new(repo)?;

    match channel {
        Some(channel) => print_release(&client.latest_by_channel(channel).await?),
        None => {
            for release in client.releases(Some(limit)).await? {
                print_release(&release);
            }
        }
    }
    Ok(())
}

async fn list_tags(config: &Config, channel: Option<Channel>, limit: usize) -> Result<()> {
    let client = TagClient::new(&config.image_repo)?;

    match channel {
        Some(channel) => print_tag(config, &client.latest_by_channel(channel).await?),
        None => {
            for tag in client.tags().await?.iter().take(limit) {
                print_tag(config, tag);
            }
        }
    }
    Ok(())
}

fn print_release(release: &Release) {
    let published = release
        .published_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    println!("{}  {}  {}", release.tag, release.channel, published);
}

fn print_tag(config: &Config, tag: &Tag) {
    println!(
        "{}  {}  {}",
        tag.name,
        tag.channel,
        registry::image_for_tag(&config.image_repo, &tag.name)
    );
}
