// ABOUTME: Container lifecycle for the managed service through the runtime's compose CLI.
// ABOUTME: Pull, recreate with name-conflict recovery, project resolution and tag discovery.

use std::sync::Arc;

use crate::config::{Config, DEFAULT_PROJECT};
use crate::runtime::{CommandEnv, CommandError, CommandRunner};
use crate::types::{ImageTag, tag_of};

use super::error::DeployError;
use super::state::StateStore;

const PROJECT_LABEL_FORMAT: &str = "{{ index .Config.Labels \"com.docker.compose.project\" }}";
const IMAGE_FORMAT: &str = "{{.Config.Image}}";

/// Drives the managed compose service.
pub struct Compose {
    runner: Arc<dyn CommandRunner>,
    config: Arc<Config>,
    state: Arc<StateStore>,
    self_id: Option<String>,
}

impl Compose {
    /// `self_id` names the container this process runs in, if any.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        config: Arc<Config>,
        state: Arc<StateStore>,
        self_id: Option<String>,
    ) -> Self {
        Self {
            runner,
            config,
            state,
            self_id,
        }
    }

    fn service(&self) -> String {
        self.config.service.to_string()
    }

    async fn env(&self, tag: &ImageTag) -> CommandEnv {
        CommandEnv::for_project(self.project().await).with_tag(tag)
    }

    async fn run(&self, args: &[&str], env: &CommandEnv) -> Result<String, CommandError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.run(&args, env).await
    }

    /// Fetch the image for `tag`.
    pub async fn pull(&self, tag: &ImageTag) -> Result<(), CommandError> {
        let env = self.env(tag).await;
        self.run(&["compose", "pull", &self.service()], &env)
            .await
            .map(drop)
    }

    /// Replace the managed container with one running `tag`.
    ///
    /// Stop and remove are best-effort. A name conflict on `up` is recovered
    /// by force-removing the named container and retrying once.
    pub async fn recreate(&self, tag: &ImageTag) -> Result<(), DeployError> {
        let env = self.env(tag).await;
        let service = self.service();

        if let Err(e) = self.run(&["compose", "stop", &service], &env).await {
            tracing::warn!(error = %e, %service, "stop failed, continuing");
        }
        if let Err(e) = self.run(&["compose", "rm", "-f", &service], &env).await {
            tracing::warn!(error = %e, %service, "remove failed, continuing");
        }

        let first = match self.up(&env).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_name_conflict() => e,
            Err(e) => return Err(DeployError::Recreate(e)),
        };

        let name = first
            .conflicting_container()
            .unwrap_or_else(|| self.config.container_name());
        tracing::warn!(container = %name, "container name still in use, forcing removal");

        if let Err(removal) = self.run(&["rm", "-f", &name], &env).await {
            return Err(DeployError::ConflictRemoval { first, removal });
        }

        self.up(&env)
            .await
            .map_err(|retry| DeployError::ConflictRetry { first, retry })
    }

    async fn up(&self, env: &CommandEnv) -> Result<(), CommandError> {
        self.run(&["compose", "up", "-d", "--no-deps", &self.service()], env)
            .await
            .map(drop)
    }

    /// Tag of the image the managed container is actually running.
    pub async fn running_tag(&self) -> Option<String> {
        let name = self.config.container_name();
        match self
            .run(&["inspect", "--format", IMAGE_FORMAT, &name], &CommandEnv::default())
            .await
        {
            Ok(out) => tag_of(out.trim()).map(str::to_string),
            Err(e) if e.is_not_found() => {
                tracing::debug!(container = %name, "app container not found");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, container = %name, "failed to inspect running image");
                None
            }
        }
    }

    /// Orchestration project, resolved once and cached.
    pub async fn project(&self) -> String {
        if let Some(project) = self.state.project() {
            return project;
        }
        let project = self.resolve_project().await;
        tracing::info!(%project, "resolved orchestration project");
        self.state.cache_project(&project);
        project
    }

    async fn resolve_project(&self) -> String {
        if let Some(ref project) = self.config.project {
            return project.clone();
        }
        if let Some(ref id) = self.self_id {
            if let Some(project) = self.project_label(id).await {
                return project;
            }
        }
        if let Some(project) = self.project_label(&self.config.container_name()).await {
            return project;
        }
        DEFAULT_PROJECT.to_string()
    }

    async fn project_label(&self, container: &str) -> Option<String> {
        match self
            .run(
                &["inspect", "--format", PROJECT_LABEL_FORMAT, container],
                &CommandEnv::default(),
            )
            .await
        {
            Ok(out) => {
                let label = out.trim();
                (!label.is_empty() && label != "<no value>").then(|| label.to_string())
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(%container, "container not found during project lookup");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, %container, "project label lookup failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for Compose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compose")
            .field("service", &self.config.service)
            .field("self_id", &self.self_id)
            .finish()
    }
}
