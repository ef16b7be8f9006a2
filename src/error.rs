// ABOUTME: Application-wide error types for the updater.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::health::HealthError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("health prober setup failed: {0}")]
    Health(#[from] HealthError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
