// ABOUTME: Production CommandRunner spawning the docker or podman CLI.
// ABOUTME: Runs in the compose working directory with project and tag overrides exported.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use snafu::ResultExt;
use tokio::process::Command;

use super::error::{CommandError, FailedSnafu, SpawnSnafu};
use super::runner::CommandRunner;
use super::types::{CommandEnv, RuntimeType};

/// Compose reads the project name from this variable.
pub const PROJECT_ENV_VAR: &str = "COMPOSE_PROJECT_NAME";

/// Spawns the runtime binary for each command.
#[derive(Debug, Clone)]
pub struct CliRunner {
    runtime: RuntimeType,
    working_dir: PathBuf,
    tag_key: String,
}

impl CliRunner {
    pub fn new(runtime: RuntimeType, working_dir: impl Into<PathBuf>, tag_key: impl Into<String>) -> Self {
        Self {
            runtime,
            working_dir: working_dir.into(),
            tag_key: tag_key.into(),
        }
    }

    fn build(&self, args: &[String], env: &CommandEnv) -> Command {
        let mut cmd = Command::new(self.runtime.binary());
        cmd.args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref project) = env.project {
            cmd.env(PROJECT_ENV_VAR, project);
        }
        if let Some(ref tag) = env.image_tag {
            cmd.env(&self.tag_key, tag.as_str());
        }
        cmd
    }
}

#[async_trait]
impl CommandRunner for CliRunner {
    async fn run(&self, args: &[String], env: &CommandEnv) -> Result<String, CommandError> {
        let command = format!("{} {}", self.runtime.binary(), args.join(" "));
        tracing::debug!(%command, project = ?env.project, "running runtime command");

        let output = self
            .build(args, env)
            .output()
            .await
            .context(SpawnSnafu { command: &command })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            return Ok(combined);
        }

        FailedSnafu {
            command,
            status: output.status.to_string(),
            output: combined.trim(),
        }
        .fail()
    }
}
