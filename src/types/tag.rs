// ABOUTME: Validated container image tag.
// ABOUTME: Tags are written to the env file and passed on command lines, so the charset is strict.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Longest tag the OCI distribution spec allows.
const MAX_TAG_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageTagError {
    #[error("image tag cannot be empty")]
    Empty,

    #[error("image tag exceeds maximum length of {MAX_TAG_LEN} characters")]
    TooLong,

    #[error("image tag cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character in image tag: '{0}'")]
    InvalidChar(char),
}

/// An image tag such as `v1.2.3`, `latest` or `nightly-2024.05.01`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageTag(String);

impl ImageTag {
    pub fn new(value: &str) -> Result<Self, ParseImageTagError> {
        let value = value.trim();
        let first = value.chars().next().ok_or(ParseImageTagError::Empty)?;

        if value.len() > MAX_TAG_LEN {
            return Err(ParseImageTagError::TooLong);
        }

        if first == '.' || first == '-' {
            return Err(ParseImageTagError::InvalidStart(first));
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '.' | '-'))
        {
            return Err(ParseImageTagError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ImageTag {
    type Err = ParseImageTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ImageTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ImageTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_tags() {
        for tag in ["v1.2.3", "latest", "1.0.0-rc.1", "nightly_2024.05.01", "sha-abc123"] {
            assert_eq!(ImageTag::new(tag).unwrap().as_str(), tag);
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(ImageTag::new("  v2.0.0\n").unwrap().as_str(), "v2.0.0");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(ImageTag::new(""), Err(ParseImageTagError::Empty));
        assert_eq!(ImageTag::new("   "), Err(ParseImageTagError::Empty));
    }

    #[test]
    fn rejects_shell_and_env_metacharacters() {
        assert_eq!(
            ImageTag::new("v1;rm"),
            Err(ParseImageTagError::InvalidChar(';'))
        );
        assert_eq!(
            ImageTag::new("v1\nOTHER=1"),
            Err(ParseImageTagError::InvalidChar('\n'))
        );
        assert_eq!(
            ImageTag::new("a:b"),
            Err(ParseImageTagError::InvalidChar(':'))
        );
    }

    #[test]
    fn rejects_leading_separator() {
        assert_eq!(
            ImageTag::new("-v1"),
            Err(ParseImageTagError::InvalidStart('-'))
        );
        assert_eq!(
            ImageTag::new(".v1"),
            Err(ParseImageTagError::InvalidStart('.'))
        );
    }

    #[test]
    fn rejects_overlong() {
        let tag = "a".repeat(MAX_TAG_LEN + 1);
        assert_eq!(ImageTag::new(&tag), Err(ParseImageTagError::TooLong));
    }

    #[test]
    fn deserializes_with_validation() {
        let ok: ImageTag = serde_json::from_str("\"v1.0.0\"").unwrap();
        assert_eq!(ok.as_str(), "v1.0.0");
        assert!(serde_json::from_str::<ImageTag>("\"bad tag\"").is_err());
    }
}
