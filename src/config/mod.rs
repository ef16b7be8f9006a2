// ABOUTME: Configuration for the updater sidecar.
// ABOUTME: Built-in defaults, an optional YAML file, then environment variable overrides.

mod deserialize;
mod healthcheck;

pub use healthcheck::HealthcheckConfig;

use crate::error::{Error, Result};
use crate::runtime::RuntimeType;
use crate::types::{ImageRef, ImageTag, ServiceName};
use deserialize::{deserialize_listen_addr, deserialize_service_name, parse_listen_addr};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Orchestration project used when neither config nor container labels name one.
pub const DEFAULT_PROJECT: &str = "deploy";

pub const ENV_WORKING_DIR: &str = "COMPOSE_DIR";
pub const ENV_SERVICE: &str = "APP_SERVICE_NAME";
pub const ENV_HEALTH_URL: &str = "HEALTH_URL";
pub const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";
pub const ENV_IMAGE_REPO: &str = "IMAGE_REPO";
pub const ENV_PROJECT: &str = "COMPOSE_PROJECT";
pub const ENV_CONTAINER_NAME: &str = "APP_CONTAINER_NAME";
pub const ENV_ENV_FILE: &str = "ENV_FILE";
pub const ENV_TAG_KEY: &str = "IMAGE_TAG_KEY";
pub const ENV_RUNTIME: &str = "CONTAINER_RUNTIME";
pub const ENV_HEALTH_TIMEOUT: &str = "HEALTH_TIMEOUT";
pub const ENV_HEALTH_INTERVAL: &str = "HEALTH_INTERVAL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the compose file and env file.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Compose service of the managed application.
    #[serde(
        default = "default_service",
        deserialize_with = "deserialize_service_name"
    )]
    pub service: ServiceName,

    #[serde(default = "default_health_url")]
    pub health_url: String,

    #[serde(
        default = "default_listen_addr",
        deserialize_with = "deserialize_listen_addr"
    )]
    pub listen_addr: SocketAddr,

    /// Image repository without tag, e.g. `ghcr.io/org/app`.
    #[serde(default = "default_image_repo")]
    pub image_repo: String,

    /// Explicit orchestration project; resolved from container labels when unset.
    #[serde(default)]
    pub project: Option<String>,

    /// Fixed name of the application container.
    #[serde(default)]
    pub container_name: Option<String>,

    /// Env file path, relative to `working_dir` unless absolute.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Key holding the image tag in the env file.
    #[serde(default = "default_tag_key")]
    pub tag_key: String,

    #[serde(default)]
    pub runtime: RuntimeType,

    #[serde(default)]
    pub healthcheck: HealthcheckConfig,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("/deploy")
}

fn default_service() -> ServiceName {
    ServiceName::default()
}

fn default_health_url() -> String {
    "http://app/health".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8484))
}

fn default_image_repo() -> String {
    "ghcr.io/example/app".to_string()
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_tag_key() -> String {
    "APP_IMAGE_TAG".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            working_dir: default_working_dir(),
            service: default_service(),
            health_url: default_health_url(),
            listen_addr: default_listen_addr(),
            image_repo: default_image_repo(),
            project: None,
            container_name: None,
            env_file: default_env_file(),
            tag_key: default_tag_key(),
            runtime: RuntimeType::default(),
            healthcheck: HealthcheckConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Defaults, then the optional file, then process environment.
    pub fn from_sources(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `lookup`; unset and empty variables are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var(ENV_WORKING_DIR) {
            self.working_dir = PathBuf::from(v);
        }
        if let Some(v) = var(ENV_SERVICE) {
            self.service = ServiceName::new(v.trim())
                .map_err(|e| invalid(ENV_SERVICE, e.to_string()))?;
        }
        if let Some(v) = var(ENV_HEALTH_URL) {
            self.health_url = v.trim().to_string();
        }
        if let Some(v) = var(ENV_LISTEN_ADDR) {
            self.listen_addr = parse_listen_addr(&v).map_err(|e| invalid(ENV_LISTEN_ADDR, e))?;
        }
        if let Some(v) = var(ENV_IMAGE_REPO) {
            self.image_repo = v.trim().to_string();
        }
        if let Some(v) = var(ENV_PROJECT) {
            self.project = Some(v.trim().to_string());
        }
        if let Some(v) = var(ENV_CONTAINER_NAME) {
            self.container_name = Some(v.trim().to_string());
        }
        if let Some(v) = var(ENV_ENV_FILE) {
            self.env_file = PathBuf::from(v);
        }
        if let Some(v) = var(ENV_TAG_KEY) {
            self.tag_key = v.trim().to_string();
        }
        if let Some(v) = var(ENV_RUNTIME) {
            self.runtime = v.parse().map_err(|e| invalid(ENV_RUNTIME, e))?;
        }
        if let Some(v) = var(ENV_HEALTH_TIMEOUT) {
            self.healthcheck.timeout = parse_duration(ENV_HEALTH_TIMEOUT, &v)?;
        }
        if let Some(v) = var(ENV_HEALTH_INTERVAL) {
            self.healthcheck.interval = parse_duration(ENV_HEALTH_INTERVAL, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.health_url.starts_with("http://") {
            return Err(invalid("health_url", "must be an http:// URL"));
        }

        let repo = ImageRef::parse(&self.image_repo)
            .map_err(|e| invalid("image_repo", e.to_string()))?;
        if repo.tag().is_some() || repo.digest().is_some() {
            return Err(invalid("image_repo", "must not include a tag or digest"));
        }

        if self.tag_key.is_empty()
            || self
                .tag_key
                .chars()
                .any(|c| c == '=' || c.is_whitespace())
        {
            return Err(invalid("tag_key", "must be non-empty without '=' or whitespace"));
        }

        if self.project.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(invalid("project", "cannot be empty"));
        }

        if self.healthcheck.interval.is_zero() || self.healthcheck.request_timeout.is_zero() {
            return Err(invalid("healthcheck", "interval and request_timeout must be non-zero"));
        }

        Ok(())
    }

    /// Full path of the env file holding the image tag.
    pub fn env_file_path(&self) -> PathBuf {
        self.working_dir.join(&self.env_file)
    }

    /// Fixed name of the application container; defaults to `{project}-{service}`.
    pub fn container_name(&self) -> String {
        self.container_name.clone().unwrap_or_else(|| {
            let project = self.project.as_deref().unwrap_or(DEFAULT_PROJECT);
            format!("{project}-{}", self.service)
        })
    }

    /// Image reference for `tag` in the configured repository.
    pub fn image_for(&self, tag: &ImageTag) -> ImageRef {
        ImageRef::with_tag(&self.image_repo, tag)
    }
}

fn invalid(field: &str, reason: impl std::fmt::Display) -> Error {
    Error::InvalidConfig(format!("{field}: {reason}"))
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|e| invalid(field, e))
}
