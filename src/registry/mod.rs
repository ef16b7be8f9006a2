// ABOUTME: Discovery of available application versions.
// ABOUTME: GitHub releases and OCI registry tags, classified into channels.

mod channel;
mod releases;
mod tags;

pub use channel::Channel;
pub use releases::{DEFAULT_API_BASE, Release, ReleaseClient};
pub use tags::{Tag, TagClient};

use std::time::Duration;

use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid image repository: {0}")]
    InvalidImage(String),

    #[error("registry authentication failed: {0}")]
    Auth(String),

    #[error("no versions found for channel {0}")]
    NoChannel(Channel),
}

/// Full image reference for `tag` in `repo`.
pub fn image_for_tag(repo: &str, tag: &str) -> String {
    format!("{}:{}", repo.trim_end_matches('/'), tag)
}

/// `owner/name` of a `ghcr.io/owner/name` image, the usual release source.
pub fn github_repo_of(image_repo: &str) -> Option<String> {
    let path = image_repo.strip_prefix("ghcr.io/")?;
    let mut parts = path.split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let name = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("{owner}/{name}"))
}

fn http_client() -> Result<reqwest::Client, RegistryError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("updater/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RegistryError::from)
}
