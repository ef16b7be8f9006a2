// ABOUTME: Durable image tag storage in the compose env file.
// ABOUTME: Rewrites a single KEY=VALUE line and leaves every other line untouched.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::ImageTag;

#[derive(Debug, Error)]
pub enum TagFileError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Reads and writes the configured target image tag.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// The configured tag, or `None` when the key is absent or empty.
    async fn read_tag(&self) -> Result<Option<String>, TagFileError>;

    /// Persist `tag`, replacing the key in place or appending it.
    async fn write_tag(&self, tag: &ImageTag) -> Result<(), TagFileError>;
}

/// A newline-delimited `KEY=VALUE` file such as compose's `.env`.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    key: String,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value of `key` in `content`, first occurrence wins.
    fn lookup(&self, content: &str) -> Option<String> {
        content
            .lines()
            .find_map(|line| self.value_of(line))
            .map(|value| unquote(value).to_string())
            .filter(|value| !value.is_empty())
    }

    fn value_of<'a>(&self, line: &'a str) -> Option<&'a str> {
        let (name, value) = line.trim().split_once('=')?;
        (name.trim_end() == self.key).then(|| value.trim())
    }

    /// `content` with the first `key` line replaced, or the key appended.
    fn with_tag(&self, content: &str, tag: &ImageTag) -> String {
        let entry = format!("{}={}", self.key, tag);
        let mut lines: Vec<&str> = content.split('\n').collect();

        match lines.iter().position(|line| self.value_of(line).is_some()) {
            Some(index) => lines[index] = entry.as_str(),
            None => {
                // Keep a trailing newline trailing.
                if lines.last() == Some(&"") {
                    lines.pop();
                    lines.push(entry.as_str());
                    lines.push("");
                } else {
                    lines.push(entry.as_str());
                }
            }
        }

        lines.join("\n")
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[async_trait]
impl TagStore for EnvFile {
    async fn read_tag(&self) -> Result<Option<String>, TagFileError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(self.lookup(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(TagFileError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn write_tag(&self, tag: &ImageTag) -> Result<(), TagFileError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(TagFileError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        // Written in place: the file is usually a single-file bind mount,
        // which cannot be replaced by rename.
        tokio::fs::write(&self.path, self.with_tag(&content, tag))
            .await
            .map_err(|source| TagFileError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), key = %self.key, %tag, "image tag persisted");
        Ok(())
    }
}
