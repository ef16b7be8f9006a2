// ABOUTME: Error types for update and rollback sequences.
// ABOUTME: Covers container recreation, conflict recovery and health verification.

use crate::health::HealthError;
use crate::runtime::CommandError;

use super::state::Status;

/// Failures at or after container recreation.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// `compose up` failed for a reason other than a name conflict.
    #[error("failed to start container: {0}")]
    Recreate(CommandError),

    /// Forced removal of the container holding the name failed.
    #[error("{first}; forced removal of conflicting container failed: {removal}")]
    ConflictRemoval {
        first: CommandError,
        removal: CommandError,
    },

    /// The single retry after forced removal failed.
    #[error("{first}; retry after forced removal failed: {retry}")]
    ConflictRetry {
        first: CommandError,
        retry: CommandError,
    },

    #[error("health check failed: {0}")]
    Health(#[from] HealthError),
}

/// A control request refused because another operation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("update already in progress: {0}")]
    UpdateInProgress(Status),

    #[error("operation in progress: {0}")]
    OperationInProgress(Status),
}
