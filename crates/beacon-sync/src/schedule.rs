//! Delayed task scheduling.
//!
//! Backoff retries are modeled as explicitly scheduled tasks with a
//! cancellation handle instead of ad hoc delayed callbacks, so pending
//! retries can be invalidated and tests can drive time deterministically
//! with tokio's paused clock.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a task scheduled with [`schedule`].
///
/// Dropping the handle detaches the task (it will still fire); call
/// [`ScheduledTask::cancel`] to prevent it from running.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Cancels the task if it has not started running yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task has already run to completion (or been cancelled).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Runs `task` after `delay` on the current tokio runtime.
pub fn schedule<F>(delay: Duration, task: F) -> ScheduledTask
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        task.await;
    });

    ScheduledTask { handle }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let task = schedule(Duration::from_secs(5), async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let task = schedule(Duration::from_secs(5), async move {
            flag.store(true, Ordering::SeqCst);
        });
        task.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
