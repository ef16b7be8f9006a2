// ABOUTME: Library root for the updater sidecar - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod envfile;
pub mod error;
pub mod health;
pub mod registry;
pub mod runtime;
pub mod server;
pub mod types;
