// ABOUTME: OCI distribution client listing image tags for a repository.
// ABOUTME: Retries once with an anonymous bearer token when the registry demands one.

use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::channel::Channel;
use super::{RegistryError, http_client};

/// Tag prefixes that are never application versions.
const IGNORED_PREFIXES: [&str; 5] = ["php", "sha256-", "sha-", "installer-", "updater-"];

/// An image tag with its inferred channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub channel: Channel,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TagClient {
    http: Client,
    base_url: String,
    path: String,
}

impl TagClient {
    /// Client for an image repository such as `ghcr.io/org/app`.
    pub fn new(image_repo: &str) -> Result<Self, RegistryError> {
        let (host, path) = image_repo
            .trim_end_matches('/')
            .split_once('/')
            .filter(|(host, path)| !host.is_empty() && !path.is_empty())
            .ok_or_else(|| RegistryError::InvalidImage(image_repo.to_string()))?;

        Ok(Self {
            http: http_client()?,
            base_url: format!("https://{host}"),
            path: path.to_string(),
        })
    }

    /// Talk to `base_url` instead of `https://{host}`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Application tags in registry order.
    pub async fn tags(&self) -> Result<Vec<Tag>, RegistryError> {
        let url = format!(
            "{}/v2/{}/tags/list",
            self.base_url.trim_end_matches('/'),
            self.path
        );

        let mut resp = self.list_request(&url).send().await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            let token = self.anonymous_token(&resp).await?;
            tracing::debug!(%url, "retrying tag list with anonymous token");
            resp = self
                .list_request(&url)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .send()
                .await?;
        }

        if !resp.status().is_success() {
            return Err(RegistryError::Status {
                url,
                status: resp.status().as_u16(),
            });
        }

        let list: TagList = resp.json().await?;
        Ok(list
            .tags
            .unwrap_or_default()
            .into_iter()
            .filter(|t| !IGNORED_PREFIXES.iter().any(|p| t.starts_with(p)))
            .map(|name| Tag {
                channel: Channel::of_tag(&name),
                name,
            })
            .collect())
    }

    /// First tag on `channel`.
    pub async fn latest_by_channel(&self, channel: Channel) -> Result<Tag, RegistryError> {
        self.tags()
            .await?
            .into_iter()
            .find(|t| t.channel == channel)
            .ok_or(RegistryError::NoChannel(channel))
    }

    fn list_request(&self, url: &str) -> RequestBuilder {
        self.http.get(url).header(ACCEPT, "application/json")
    }

    async fn anonymous_token(&self, challenged: &Response) -> Result<String, RegistryError> {
        let header = challenged
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::Auth("401 without a challenge".to_string()))?;

        let challenge = BearerChallenge::parse(header)
            .ok_or_else(|| RegistryError::Auth(format!("unsupported challenge: {header}")))?;

        let resp = self
            .http
            .get(&challenge.realm)
            .query(&challenge.params)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RegistryError::Status {
                url: challenge.realm,
                status: resp.status().as_u16(),
            });
        }

        let body: TokenResponse = resp.json().await?;
        body.token
            .or(body.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RegistryError::Auth("token endpoint returned no token".to_string()))
    }
}

/// `Bearer realm="...",service="...",scope="..."`
#[derive(Debug, Clone, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    params: Vec<(String, String)>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let (scheme, rest) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut realm = None;
        let mut params = Vec::new();
        for part in split_params(rest) {
            let (key, value) = part.split_once('=')?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().trim_matches('"').to_string();
            if key == "realm" {
                realm = Some(value);
            } else {
                params.push((key, value));
            }
        }

        Some(Self {
            realm: realm?,
            params,
        })
    }
}

/// Split on commas outside double quotes; scopes may contain commas.
fn split_params(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in input.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
