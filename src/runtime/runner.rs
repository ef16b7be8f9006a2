// ABOUTME: Command execution trait for the container runtime CLI.
// ABOUTME: Orchestration depends only on this seam so tests can script outcomes.

use async_trait::async_trait;

use super::error::CommandError;
use super::types::CommandEnv;

/// Run one container runtime command.
///
/// `args` excludes the binary itself, e.g. `["compose", "pull", "app"]`.
/// On success the combined stdout and stderr is returned.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String], env: &CommandEnv) -> Result<String, CommandError>;
}
