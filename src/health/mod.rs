// ABOUTME: Health gate that polls the application's HTTP health endpoint.
// ABOUTME: Healthy means HTTP 200 with status "ok" and a reachable database.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::{ACCEPT, USER_AGENT};
use hyper::{Request, StatusCode, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::config::HealthcheckConfig;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("invalid health check URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("health check timed out after {0:?}")]
    Timeout(Duration),
}

/// Blocks a sequence until the application is ready or a deadline passes.
#[async_trait]
pub trait HealthGate: Send + Sync {
    async fn wait_until_healthy(&self, deadline: Duration) -> Result<(), HealthError>;
}

/// Body served by the application's health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub db: bool,
    /// Reported for visibility only; a cold cache does not block the gate.
    #[serde(default)]
    pub cache: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "ok" && self.db
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy(HealthReport),
    NotReady(String),
}

/// Polls an `http://` health endpoint.
#[derive(Clone)]
pub struct HttpHealthProber {
    url: Uri,
    client: Client<HttpConnector, Empty<Bytes>>,
    interval: Duration,
    request_timeout: Duration,
}

impl HttpHealthProber {
    pub fn new(url: &str, config: &HealthcheckConfig) -> Result<Self, HealthError> {
        let invalid = |reason: String| HealthError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let parsed = url.parse::<Uri>().map_err(|e| invalid(e.to_string()))?;
        match parsed.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(format!("unsupported scheme {other}"))),
            None => return Err(invalid("missing scheme".to_string())),
        }
        if parsed.host().is_none() {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self {
            url: parsed,
            client: Client::builder(TokioExecutor::new()).build_http(),
            interval: config.interval,
            request_timeout: config.request_timeout,
        })
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Issue one request and classify the answer.
    pub async fn probe(&self) -> ProbeOutcome {
        match tokio::time::timeout(self.request_timeout, self.fetch_report()).await {
            Err(_) => ProbeOutcome::NotReady(format!(
                "no response within {:?}",
                self.request_timeout
            )),
            Ok(Err(reason)) => ProbeOutcome::NotReady(reason),
            Ok(Ok(report)) if report.is_healthy() => ProbeOutcome::Healthy(report),
            Ok(Ok(report)) => ProbeOutcome::NotReady(format!(
                "status={} db={} cache={}",
                report.status, report.db, report.cache
            )),
        }
    }

    async fn fetch_report(&self) -> Result<HealthReport, String> {
        let req = Request::get(self.url.clone())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("updater/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<Bytes>::new())
            .map_err(|e| format!("failed to build request: {e}"))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if resp.status() != StatusCode::OK {
            return Err(format!("unexpected status {}", resp.status()));
        }

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("failed to read body: {e}"))?
            .to_bytes();

        serde_json::from_slice(&body).map_err(|e| format!("malformed health body: {e}"))
    }
}

impl std::fmt::Debug for HttpHealthProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpHealthProber")
            .field("url", &self.url)
            .field("interval", &self.interval)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[async_trait]
impl HealthGate for HttpHealthProber {
    async fn wait_until_healthy(&self, deadline: Duration) -> Result<(), HealthError> {
        let started = Instant::now();
        let mut attempts = 0u32;

        while started.elapsed() < deadline {
            attempts += 1;
            match self.probe().await {
                ProbeOutcome::Healthy(report) => {
                    tracing::info!(attempts, cache = report.cache, "health check passed");
                    return Ok(());
                }
                ProbeOutcome::NotReady(reason) => {
                    tracing::debug!(attempts, %reason, url = %self.url, "application not healthy yet");
                }
            }
            tokio::time::sleep(self.interval).await;
        }

        Err(HealthError::Timeout(deadline))
    }
}
