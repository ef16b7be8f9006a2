// ABOUTME: Container image reference parsing.
// ABOUTME: Handles formats like app, app:tag, registry:5000/org/app:tag@digest.

use std::fmt;
use thiserror::Error;

use super::tag::ImageTag;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),
}

/// An image reference split into repository, tag and digest.
///
/// The repository keeps its registry host (including any `:port`), so
/// `localhost:5000/app:v1` has repository `localhost:5000/app` and tag `v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input.chars().find(|c| {
            !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@')
        }) {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) => (before, Some(after.to_string())),
            None => (input, None),
        };

        let (repository, tag) = split_tag(without_digest);

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.map(str::to_string),
            digest,
        })
    }

    /// Build `repository:tag` for a validated tag.
    pub fn with_tag(repository: &str, tag: &ImageTag) -> Self {
        Self {
            repository: repository.trim_end_matches('/').to_string(),
            tag: Some(tag.to_string()),
            digest: None,
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

/// Extract the tag from an image reference as reported by the runtime.
///
/// Drops any `@digest`, then takes the text after the last `:` that follows
/// the last `/`. A colon before the last slash belongs to a registry port.
/// Returns `None` for untagged references.
pub fn tag_of(reference: &str) -> Option<&str> {
    let reference = reference.trim();
    let without_digest = reference
        .split_once('@')
        .map_or(reference, |(before, _)| before);

    split_tag(without_digest).1.filter(|tag| !tag.is_empty())
}

fn split_tag(reference: &str) -> (&str, Option<&str>) {
    let name_start = reference.rfind('/').map_or(0, |slash| slash + 1);
    match reference[name_start..].rfind(':') {
        Some(colon) => {
            let colon = name_start + colon;
            (&reference[..colon], Some(&reference[colon + 1..]))
        }
        None => (reference, None),
    }
}
