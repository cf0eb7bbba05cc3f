// Timeout supervision and cooperative interruption for task runs.
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::agent_engine::state::TaskOutcome;

/// Shared interrupt flag, checked by the loop between steps and between
/// dispatched actions.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run `task` on its own tokio task and race it against `timeout`.
///
/// On deadline the task is aborted at its next await point and
/// [`TaskOutcome::TimedOut`] is returned; whatever device action was in
/// flight is neither awaited nor rolled back. A panic inside the task is
/// reported as [`TaskOutcome::Failed`].
pub async fn supervise<F>(timeout: Duration, task: F) -> TaskOutcome
where
    F: Future<Output = bool> + Send + 'static,
{
    let handle = tokio::spawn(task);
    let abort = handle.abort_handle();

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(finished)) => TaskOutcome::from_bool(finished),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "task loop panicked");
            TaskOutcome::Failed
        }
        Err(_) => {
            abort.abort();
            tracing::error!(timeout_secs = timeout.as_secs_f64(), "Task did not complete within the timeout period.");
            TaskOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_the_loop_result() {
        assert_eq!(supervise(Duration::from_secs(5), async { true }).await, TaskOutcome::Finished);
        assert_eq!(supervise(Duration::from_secs(5), async { false }).await, TaskOutcome::Failed);
    }

    #[tokio::test]
    async fn deadline_abandons_the_loop() {
        let reached_end = StopFlag::new();
        let flag = reached_end.clone();
        let outcome = supervise(Duration::from_millis(50), async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            flag.set();
            true
        })
        .await;
        assert_eq!(outcome, TaskOutcome::TimedOut);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reached_end.is_set());
    }

    #[tokio::test]
    async fn panic_is_a_failed_task() {
        let outcome = supervise(Duration::from_secs(5), async { Option::<bool>::None.expect("boom") }).await;
        assert_eq!(outcome, TaskOutcome::Failed);
    }
}
