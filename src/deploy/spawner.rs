// ABOUTME: Detached execution of dispatched sequences.
// ABOUTME: Production hands work to tokio; tests queue it and drive it themselves.

use futures::future::BoxFuture;

/// Accepts a unit of work that must outlive the request that created it.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Runs each task on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}
