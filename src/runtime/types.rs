// ABOUTME: Runtime type and per-command environment definitions.
// ABOUTME: RuntimeType selects the CLI binary; CommandEnv carries compose overrides.

use serde::{Deserialize, Serialize};

use crate::types::ImageTag;

/// The container runtime CLI used for every lifecycle command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    #[default]
    Docker,
    Podman,
}

impl RuntimeType {
    /// Name of the executable to spawn.
    pub fn binary(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

impl std::str::FromStr for RuntimeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(RuntimeType::Docker),
            "podman" => Ok(RuntimeType::Podman),
            other => Err(format!("unknown container runtime: {other}")),
        }
    }
}

/// Environment overrides applied to a single command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnv {
    /// Orchestration project the command is scoped to.
    pub project: Option<String>,
    /// Image tag exported under the configured tag key, overriding the env file.
    pub image_tag: Option<ImageTag>,
}

impl CommandEnv {
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            image_tag: None,
        }
    }

    pub fn with_tag(mut self, tag: &ImageTag) -> Self {
        self.image_tag = Some(tag.clone());
        self
    }
}
