// ABOUTME: Observable deployment state and the lock that guards it.
// ABOUTME: Also caches the resolved orchestration project for the process lifetime.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

use crate::types::ImageTag;

use super::error::Rejected;

/// Sequence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Pulling,
    Stopping,
    Starting,
    HealthCheck,
    Completed,
    Failed,
    RollingBack,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Pulling => "pulling",
            Status::Stopping => "stopping",
            Status::Starting => "starting",
            Status::HealthCheck => "health_check",
            Status::Completed => "completed",
            Status::Failed => "failed",
            Status::RollingBack => "rolling_back",
        }
    }

    /// A new update may start from here.
    pub fn accepts_update(&self) -> bool {
        matches!(self, Status::Idle | Status::Completed | Status::Failed)
    }

    /// Steps a rollback request must not interrupt.
    pub fn blocks_rollback(&self) -> bool {
        matches!(
            self,
            Status::Pulling | Status::Stopping | Status::Starting | Status::RollingBack
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub status: Status,
    pub message: String,
    pub progress: u8,
    pub target_tag: String,
    pub previous_tag: String,
}

impl Default for State {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            message: "Ready".to_string(),
            progress: 0,
            target_tag: String::new(),
            previous_tag: String::new(),
        }
    }
}

/// Which request is asking for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Update,
    Rollback,
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    /// (status, progress) of every transition since the sequence began.
    transitions: Vec<(Status, u8)>,
    project: Option<String>,
}

/// The single mutable deployment record.
///
/// The lock is held only for field access, never across an external
/// command, so status reads never wait on a running sequence.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: Mutex<Inner>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> State {
        self.inner.lock().state.clone()
    }

    pub fn status(&self) -> Status {
        self.inner.lock().state.status
    }

    /// Overwrite status, message and progress together.
    pub fn set(&self, status: Status, message: impl Into<String>, progress: u8) {
        let message = message.into();
        {
            let mut inner = self.inner.lock();
            inner.state.status = status;
            inner.state.message = message.clone();
            inner.state.progress = progress;
            inner.transitions.push((status, progress));
        }
        tracing::info!(%status, progress, %message, "state transition");
    }

    /// Record the tags of a sequence that is starting.
    pub fn begin(&self, target: &ImageTag, previous: &str) {
        let mut inner = self.inner.lock();
        inner.state.target_tag = target.to_string();
        inner.state.previous_tag = previous.to_string();
        inner.transitions.clear();
    }

    /// Transitions of the current sequence, oldest first.
    pub fn transitions(&self) -> Vec<(Status, u8)> {
        self.inner.lock().transitions.clone()
    }

    /// Check-then-claim admission for a new sequence.
    ///
    /// On success the state moves to `pulling` at progress 10 with the new
    /// target recorded, so a request arriving before the dispatched sequence
    /// runs already observes an active operation. `previousTag` keeps its
    /// value until the sequence resolves the running tag.
    pub fn admit(&self, operation: Operation, target: &ImageTag) -> Result<(), Rejected> {
        let mut inner = self.inner.lock();
        let status = inner.state.status;

        match operation {
            Operation::Update if !status.accepts_update() => {
                return Err(Rejected::UpdateInProgress(status));
            }
            Operation::Rollback if status.blocks_rollback() => {
                return Err(Rejected::OperationInProgress(status));
            }
            _ => {}
        }

        inner.state.status = Status::Pulling;
        inner.state.message = format!("Preparing {target}...");
        inner.state.progress = 10;
        inner.state.target_tag = target.to_string();
        Ok(())
    }

    pub fn project(&self) -> Option<String> {
        self.inner.lock().project.clone()
    }

    pub fn cache_project(&self, project: &str) {
        self.inner.lock().project = Some(project.to_string());
    }
}
