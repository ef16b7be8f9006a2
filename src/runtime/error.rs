// ABOUTME: Command execution errors with SNAFU pattern.
// ABOUTME: Classifies runtime CLI failures for conflict recovery and lookup fallbacks.

use snafu::Snafu;

/// Failure of a single container runtime CLI invocation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CommandError {
    #[snafu(display("{command}: failed to launch: {source}"))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("{command}: {status}: {output}"))]
    Failed {
        command: String,
        status: String,
        output: String,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    /// The runtime binary could not be started at all.
    Launch,
    /// A container with the requested fixed name already exists.
    NameConflict,
    /// The inspected container or object does not exist.
    NotFound,
    /// Any other non-zero exit.
    Other,
}

const NAME_CONFLICT_MARKER: &str = "is already in use by";
const CONTAINER_NAME_MARKER: &str = "container name \"";
const NOT_FOUND_MARKERS: [&str; 3] = ["no such container", "no such object", "no container with name or id"];

impl CommandError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> CommandErrorKind {
        match self {
            CommandError::Spawn { .. } => CommandErrorKind::Launch,
            CommandError::Failed { output, .. } => {
                let lower = output.to_ascii_lowercase();
                if lower.contains(NAME_CONFLICT_MARKER) {
                    CommandErrorKind::NameConflict
                } else if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
                    CommandErrorKind::NotFound
                } else {
                    CommandErrorKind::Other
                }
            }
        }
    }

    pub fn is_name_conflict(&self) -> bool {
        self.kind() == CommandErrorKind::NameConflict
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == CommandErrorKind::NotFound
    }

    /// Name of the container holding the name, as quoted in a conflict message.
    ///
    /// Docker reports `The container name "/app" is already in use ...`,
    /// Podman omits the leading slash.
    pub fn conflicting_container(&self) -> Option<String> {
        let CommandError::Failed { output, .. } = self else {
            return None;
        };
        if !self.is_name_conflict() {
            return None;
        }

        // ASCII lowercasing keeps byte offsets aligned with `output`.
        let start = output
            .to_ascii_lowercase()
            .find(CONTAINER_NAME_MARKER)?
            + CONTAINER_NAME_MARKER.len();
        let rest = &output[start..];
        let name = &rest[..rest.find('"')?];
        let name = name.trim_start_matches('/');

        (!name.is_empty()).then(|| name.to_string())
    }
}
