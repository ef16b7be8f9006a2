// ABOUTME: Health gate timing configuration.
// ABOUTME: Overall deadline, poll interval and per-request timeout with sensible defaults.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthcheckConfig {
    /// Overall deadline for the application to report healthy.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Pause between probes.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Timeout for a single probe request.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            interval: default_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}
