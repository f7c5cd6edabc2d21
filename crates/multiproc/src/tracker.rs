//! Counted completion event over the pool's worker tasks.

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Tracks a fixed set of spawned workers and fires once all have exited.
///
/// Workers are registered with [`spawn`](Self::spawn). After the last worker
/// is registered the tracker is [`seal`](Self::seal)ed; from then on
/// [`all_exited`](Self::all_exited) resolves as soon as every registered task
/// has finished and stays resolved afterwards.
///
/// The tracker only certifies that the pool will not touch the source or the
/// processor again. Per-worker results travel through a separate channel.
#[derive(Clone, Debug, Default)]
pub struct CompletionTracker {
    tasks: TaskTracker,
}

impl CompletionTracker {
    /// Creates an empty, unsealed tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `future` on the current tokio runtime and counts it towards
    /// completion.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(future)
    }

    /// Marks the worker set as complete.
    ///
    /// [`all_exited`](Self::all_exited) never resolves on an unsealed tracker.
    pub fn seal(&self) {
        self.tasks.close();
    }

    /// Number of registered workers still running.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` once the tracker is sealed and every worker has exited.
    pub fn is_complete(&self) -> bool {
        self.tasks.is_closed() && self.tasks.is_empty()
    }

    /// Resolves once the tracker is sealed and every worker has exited.
    pub async fn all_exited(&self) {
        self.tasks.wait().await;
    }
}
