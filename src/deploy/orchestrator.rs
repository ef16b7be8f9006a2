// ABOUTME: The update sequence: pull, persist, recreate, verify, then commit or roll back.
// ABOUTME: Admission checks and detached dispatch for control requests.

use std::sync::Arc;

use crate::config::Config;
use crate::envfile::{EnvFile, TagStore};
use crate::health::{HealthError, HealthGate, HttpHealthProber};
use crate::runtime::{CliRunner, CommandRunner};
use crate::types::ImageTag;

use super::compose::Compose;
use super::error::{DeployError, Rejected};
use super::spawner::{TaskSpawner, TokioSpawner};
use super::state::{Operation, State, StateStore, Status};

/// Previous tag recorded when neither the container nor the tag file names one.
pub const UNKNOWN_TAG: &str = "unknown";

/// External capabilities the orchestrator depends on.
pub struct Collaborators {
    pub runner: Arc<dyn CommandRunner>,
    pub tags: Arc<dyn TagStore>,
    pub health: Arc<dyn HealthGate>,
    pub spawner: Arc<dyn TaskSpawner>,
    /// Id of the container this process runs in, used for project lookup.
    pub self_id: Option<String>,
}

impl Collaborators {
    /// Real runtime CLI, env file, HTTP prober and tokio tasks.
    pub fn production(config: &Config) -> Result<Self, HealthError> {
        let health = HttpHealthProber::new(&config.health_url, &config.healthcheck)?;
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();

        Ok(Self {
            runner: Arc::new(CliRunner::new(
                config.runtime,
                &config.working_dir,
                &config.tag_key,
            )),
            tags: Arc::new(EnvFile::new(config.env_file_path(), &config.tag_key)),
            health: Arc::new(health),
            spawner: Arc::new(TokioSpawner),
            self_id: Some(hostname).filter(|h| !h.is_empty()),
        })
    }
}

/// Owns the deployment state and runs sequences against it.
pub struct Orchestrator {
    config: Arc<Config>,
    state: Arc<StateStore>,
    compose: Compose,
    tags: Arc<dyn TagStore>,
    health: Arc<dyn HealthGate>,
    spawner: Arc<dyn TaskSpawner>,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>, state: Arc<StateStore>, collaborators: Collaborators) -> Self {
        let Collaborators {
            runner,
            tags,
            health,
            spawner,
            self_id,
        } = collaborators;

        Self {
            compose: Compose::new(runner, Arc::clone(&config), Arc::clone(&state), self_id),
            config,
            state,
            tags,
            health,
            spawner,
        }
    }

    pub fn status(&self) -> State {
        self.state.snapshot()
    }

    /// Admit an update to `target` and run it detached.
    pub fn start_update(self: &Arc<Self>, target: ImageTag) -> Result<(), Rejected> {
        self.dispatch(Operation::Update, target)
    }

    /// Admit a user-requested rollback: a full update sequence targeting `tag`.
    pub fn start_rollback(self: &Arc<Self>, tag: ImageTag) -> Result<(), Rejected> {
        self.dispatch(Operation::Rollback, tag)
    }

    fn dispatch(self: &Arc<Self>, operation: Operation, target: ImageTag) -> Result<(), Rejected> {
        self.state.admit(operation, &target)?;
        tracing::info!(?operation, %target, "sequence dispatched");

        let this = Arc::clone(self);
        self.spawner
            .spawn(Box::pin(async move { this.run_update(target).await }));
        Ok(())
    }

    /// Run one sequence to a terminal state.
    pub async fn run_update(&self, target: ImageTag) {
        let previous = self.previous_tag().await;
        self.state.begin(&target, &previous);

        self.state.set(
            Status::Pulling,
            format!("Pulling {}...", self.config.image_for(&target)),
            10,
        );
        if let Err(e) = self.compose.pull(&target).await {
            self.state.set(Status::Failed, format!("Pull failed: {e}"), 0);
            return;
        }

        self.state.set(Status::Stopping, "Updating image tag...", 30);
        self.persist(&target).await;

        self.state
            .set(Status::Starting, "Recreating app container...", 50);
        if let Err(e) = self.compose.recreate(&target).await {
            tracing::warn!(error = %e, %target, "recreate failed");
            self.rollback_to(&previous, e).await;
            return;
        }

        self.state
            .set(Status::HealthCheck, "Waiting for health check...", 70);
        if let Err(e) = self
            .health
            .wait_until_healthy(self.config.healthcheck.timeout)
            .await
        {
            tracing::warn!(error = %e, %target, "new version failed health check");
            self.rollback_to(&previous, e.into()).await;
            return;
        }

        self.state
            .set(Status::Completed, format!("Updated to {target}"), 100);
    }

    /// Recovery step of a failed sequence; always ends `failed`.
    async fn rollback_to(&self, previous: &str, cause: DeployError) {
        let rolling_back = if previous == UNKNOWN_TAG {
            "Rolling back...".to_string()
        } else {
            format!("Rolling back to {previous}...")
        };
        self.state.set(Status::RollingBack, rolling_back, 80);

        let tag = match ImageTag::new(previous) {
            Ok(_) if previous == UNKNOWN_TAG => {
                self.state.set(
                    Status::Failed,
                    format!("{cause}; no previous tag is known to roll back to"),
                    0,
                );
                return;
            }
            Ok(tag) => tag,
            Err(e) => {
                tracing::warn!(error = %e, previous, "previous tag is not a valid image tag");
                self.state.set(
                    Status::Failed,
                    format!("{cause}; previous tag {previous:?} cannot be restored: {e}"),
                    0,
                );
                return;
            }
        };

        self.persist(&tag).await;

        let message = match self.compose.recreate(&tag).await {
            Ok(()) => format!("Rolled back to {tag} after update failure: {cause}"),
            Err(e) => format!("Rollback to {tag} failed: {e}"),
        };
        self.state.set(Status::Failed, message, 0);
    }

    /// Running container first; the tag file can drift.
    async fn previous_tag(&self) -> String {
        if let Some(tag) = self.compose.running_tag().await {
            return tag;
        }
        match self.tags.read_tag().await {
            Ok(Some(tag)) => tag,
            Ok(None) => UNKNOWN_TAG.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read tag file");
                UNKNOWN_TAG.to_string()
            }
        }
    }

    async fn persist(&self, tag: &ImageTag) {
        if let Err(e) = self.tags.write_tag(tag).await {
            tracing::warn!(error = %e, %tag, "failed to persist image tag, continuing");
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("compose", &self.compose)
            .field("state", &self.state)
            .finish()
    }
}
