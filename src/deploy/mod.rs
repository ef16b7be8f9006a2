// ABOUTME: Update and rollback orchestration for the managed container.
// ABOUTME: Exports the state machine, its collaborators and the task spawner.

mod compose;
mod error;
mod orchestrator;
mod spawner;
mod state;

pub use compose::Compose;
pub use error::{DeployError, Rejected};
pub use orchestrator::{Collaborators, Orchestrator, UNKNOWN_TAG};
pub use spawner::{TaskSpawner, TokioSpawner};
pub use state::{Operation, State, StateStore, Status};
