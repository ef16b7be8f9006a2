// ABOUTME: GitHub releases client listing application versions.
// ABOUTME: Pages through the releases API and skips installer and updater releases.

use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::channel::Channel;
use super::{RegistryError, http_client};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

/// A published application release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(skip, default = "default_channel")]
    pub channel: Channel,
}

fn default_channel() -> Channel {
    Channel::Release
}

#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: Client,
    api_base: String,
    repo: String,
}

impl ReleaseClient {
    /// Client for `owner/name` on github.com.
    pub fn new(repo: impl Into<String>) -> Result<Self, RegistryError> {
        Ok(Self {
            http: http_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
            repo: repo.into(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Application releases, newest first as GitHub returns them.
    ///
    /// `limit` stops paging once that many releases are collected.
    pub async fn releases(&self, limit: Option<usize>) -> Result<Vec<Release>, RegistryError> {
        let url = format!(
            "{}/repos/{}/releases",
            self.api_base.trim_end_matches('/'),
            self.repo
        );
        let mut collected = Vec::new();

        for page in 1.. {
            let resp = self
                .http
                .get(&url)
                .header(ACCEPT, "application/vnd.github.v3+json")
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())])
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(RegistryError::Status {
                    url,
                    status: resp.status().as_u16(),
                });
            }

            let batch: Vec<Release> = resp.json().await?;
            let page_len = batch.len();
            tracing::debug!(page, count = page_len, repo = %self.repo, "fetched releases page");

            for mut release in batch.into_iter().filter(|r| is_app_release(&r.tag)) {
                release.channel = Channel::of_release(&release.tag, &release.name, release.prerelease);
                collected.push(release);
                if limit.is_some_and(|n| collected.len() >= n) {
                    return Ok(collected);
                }
            }

            if page_len < PER_PAGE {
                break;
            }
        }

        Ok(collected)
    }

    /// Newest release on `channel` among the 50 most recent.
    pub async fn latest_by_channel(&self, channel: Channel) -> Result<Release, RegistryError> {
        self.releases(Some(50))
            .await?
            .into_iter()
            .find(|r| r.channel == channel)
            .ok_or(RegistryError::NoChannel(channel))
    }
}

fn is_app_release(tag: &str) -> bool {
    let tag = tag.trim().to_lowercase();
    !tag.is_empty() && !tag.starts_with("installer-") && !tag.starts_with("updater-")
}
