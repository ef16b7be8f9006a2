// ABOUTME: Container runtime command execution for Docker and Podman.
// ABOUTME: Exposes the CommandRunner seam and its CLI-spawning implementation.

mod cli;
mod error;
mod runner;
mod types;

pub use cli::{CliRunner, PROJECT_ENV_VAR};
pub use error::{CommandError, CommandErrorKind};
pub use runner::CommandRunner;
pub use types::{CommandEnv, RuntimeType};
