// ABOUTME: Release channel classification from tag and release names.
// ABOUTME: Channels: nightly, dev, beta, release.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Nightly,
    Dev,
    Beta,
    Release,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Nightly => "nightly",
            Channel::Dev => "dev",
            Channel::Beta => "beta",
            Channel::Release => "release",
        }
    }

    /// Classify a GitHub release; nightly and dev also match on the release name.
    pub fn of_release(tag: &str, name: &str, prerelease: bool) -> Self {
        let tag = tag.to_lowercase();
        let name = name.to_lowercase();

        if tag.contains("nightly") || name.contains("nightly") {
            Channel::Nightly
        } else if tag.contains("dev") || name.contains("dev") {
            Channel::Dev
        } else if prerelease || is_prerelease_text(&tag) {
            Channel::Beta
        } else {
            Channel::Release
        }
    }

    /// Classify a bare image tag.
    pub fn of_tag(tag: &str) -> Self {
        let tag = tag.to_lowercase();

        if tag.contains("nightly") {
            Channel::Nightly
        } else if tag.contains("dev") {
            Channel::Dev
        } else if is_prerelease_text(&tag) {
            Channel::Beta
        } else {
            Channel::Release
        }
    }
}

fn is_prerelease_text(lower: &str) -> bool {
    ["beta", "rc", "alpha"].iter().any(|m| lower.contains(m))
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nightly" => Ok(Channel::Nightly),
            "dev" => Ok(Channel::Dev),
            "beta" => Ok(Channel::Beta),
            "release" => Ok(Channel::Release),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nightly_wins_over_everything() {
        assert_eq!(Channel::of_release("v2-nightly-rc1", "", true), Channel::Nightly);
        assert_eq!(Channel::of_release("v2.0.0", "Nightly build", false), Channel::Nightly);
    }

    #[test]
    fn prerelease_flag_means_beta() {
        assert_eq!(Channel::of_release("v2.0.0", "2.0.0", true), Channel::Beta);
        assert_eq!(Channel::of_release("v2.0.0-rc.1", "", false), Channel::Beta);
        assert_eq!(Channel::of_release("v2.0.0", "2.0.0", false), Channel::Release);
    }

    #[test]
    fn tags_classify_by_text() {
        assert_eq!(Channel::of_tag("dev-20240101"), Channel::Dev);
        assert_eq!(Channel::of_tag("v1.2.0-alpha.3"), Channel::Beta);
        assert_eq!(Channel::of_tag("latest"), Channel::Release);
        assert_eq!(Channel::of_tag("v1.2.0"), Channel::Release);
    }

    #[test]
    fn parses_from_cli_text() {
        assert_eq!("Beta".parse::<Channel>().unwrap(), Channel::Beta);
        assert!("stable".parse::<Channel>().is_err());
    }
}
