use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::agent_engine::engine::TaskLoop;
use crate::agent_engine::loop_control::supervise;
use crate::agent_engine::state::{StepFrame, TaskOutcome};

/// Frames buffered ahead of a slow consumer before the loop waits.
pub const FRAME_BUFFER: usize = 32;

/// Streaming handle to a supervised task run.
///
/// Yields one [`StepFrame`] per iteration and ends when the run does.
/// Dropping it stops the loop at its next frame.
pub struct TaskProgress {
    frames: mpsc::Receiver<StepFrame>,
    outcome: JoinHandle<TaskOutcome>,
}

impl TaskProgress {
    /// Start `task` under the timeout supervisor with frame emission on.
    pub fn spawn(task: TaskLoop, prompt: String, timeout: Duration) -> Self {
        let (tx, frames) = mpsc::channel(FRAME_BUFFER);
        let mut task = task.with_frames(tx);
        let outcome = tokio::spawn(supervise(timeout, async move { task.run(&prompt).await }));
        Self { frames, outcome }
    }

    pub async fn next_frame(&mut self) -> Option<StepFrame> {
        self.frames.recv().await
    }

    /// Wait for the run to end, discarding frames not yet consumed.
    pub async fn outcome(mut self) -> TaskOutcome {
        while self.frames.recv().await.is_some() {}
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "supervisor task failed");
                TaskOutcome::Failed
            }
        }
    }
}

impl Stream for TaskProgress {
    type Item = StepFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StepFrame>> {
        self.frames.poll_recv(cx)
    }
}
