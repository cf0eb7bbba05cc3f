use std::time::Duration;

use tokio::sync::mpsc;

use crate::agent_engine::conversation::ConversationHistory;
use crate::agent_engine::history::{JournalEntry, SessionHistory};
use crate::agent_engine::loop_control::StopFlag;
use crate::agent_engine::state::{LoopState, PlannedCall, StepFrame};
use crate::errors::{ClickError, ClickResult};
use crate::executor::coordinator::BoundingBox;
use crate::executor::dispatcher::{ActionKind, ActionOutcome, ActionRegistry};
use crate::perception::screenshot::Screenshot;

/// The screenshot → plan → dispatch state machine for one task.
///
/// Steps run strictly in sequence and the planner's call order is preserved.
/// The loop only ends on `task_finished`, an interrupt, a dropped progress
/// consumer, or an error escaping the per-call guard; wall-clock limits are
/// the supervisor's job (see [`supervise`](super::loop_control::supervise)).
pub struct TaskLoop {
    registry: ActionRegistry,
    history: ConversationHistory,
    delay: Duration,
    stop: StopFlag,
    journal: Option<SessionHistory>,
    frames: Option<mpsc::Sender<StepFrame>>,
    state: LoopState,
    step: u64,
    /// Observation from the last dispatched call, consumed by the next plan.
    observation: String,
}

impl TaskLoop {
    pub fn new(registry: ActionRegistry, history: ConversationHistory, delay: Duration) -> Self {
        Self {
            registry,
            history,
            delay,
            stop: StopFlag::new(),
            journal: None,
            frames: None,
            state: LoopState::Ready,
            step: 0,
            observation: String::new(),
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_journal(mut self, journal: SessionHistory) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Emit a [`StepFrame`] on `tx` at the start of every iteration.
    pub fn with_frames(mut self, tx: mpsc::Sender<StepFrame>) -> Self {
        self.frames = Some(tx);
        self
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Drive the task until it finishes (`true`) or fails (`false`).
    pub async fn run(&mut self, prompt: &str) -> bool {
        tracing::info!(prompt, "task started");
        self.journal(JournalEntry::new(0, "task").outcome(prompt));

        let finished = match self.drive(prompt).await {
            Ok(finished) => finished,
            Err(ClickError::Cancelled) => {
                tracing::info!(step = self.step, "Task execution interrupted");
                false
            }
            Err(e) => {
                tracing::error!(step = self.step, error = %e, "An error occurred during task execution");
                false
            }
        };

        self.transition(if finished { LoopState::Finished } else { LoopState::Failed });
        self.journal(JournalEntry::new(self.step, "result").outcome(finished.to_string()));
        finished
    }

    async fn drive(&mut self, prompt: &str) -> ClickResult<bool> {
        loop {
            if self.stop.is_set() {
                return Err(ClickError::Cancelled);
            }
            if self.step_once(prompt).await? {
                return Ok(true);
            }
        }
    }

    /// One iteration; `Ok(true)` once `task_finished` has been dispatched.
    async fn step_once(&mut self, prompt: &str) -> ClickResult<bool> {
        self.step += 1;
        self.transition(LoopState::Observing);
        let screenshot = self
            .registry
            .executor()
            .screenshot("Planner took screenshot")
            .await;
        if screenshot.is_none() {
            tracing::warn!(step = self.step, "no screenshot this step");
        }
        tokio::time::sleep(self.delay).await;

        self.emit_frame(screenshot.as_ref()).await?;

        self.transition(LoopState::Planning);
        let observation = std::mem::take(&mut self.observation);
        let calls = self
            .registry
            .planner()
            .resolve(&mut self.history, prompt, &observation, screenshot.as_ref())
            .await?;

        self.transition(LoopState::Dispatching);
        for call in calls {
            if self.stop.is_set() {
                return Err(ClickError::Cancelled);
            }
            match self.dispatch(&call).await {
                Ok(true) => return Ok(true),
                Ok(false) => {
                    if let Some(obs) = call.observation() {
                        self.observation = obs.to_string();
                    }
                }
                Err(e) => {
                    tracing::error!(
                        function = call.name.as_deref().unwrap_or("<none>"),
                        error = %e,
                        "Error executing function"
                    );
                    self.journal_call(&call, format!("error: {e}"));
                }
            }
        }
        Ok(false)
    }

    /// Execute one planned call. `Ok(true)` means the task is finished.
    async fn dispatch(&mut self, call: &PlannedCall) -> ClickResult<bool> {
        let Some(name) = call.name.as_deref() else {
            tracing::debug!(step = self.step, "no function called this step");
            return Ok(false);
        };
        tracing::debug!(function = name, args = %call.arguments, "Executing function");

        let kind = self.registry.resolve(name)?;
        let outcome = self.registry.invoke(kind, &call.arguments).await?;
        match outcome {
            ActionOutcome::Finished => {
                self.journal_call(call, "finished");
                Ok(true)
            }
            ActionOutcome::Performed(success) => {
                tracing::info!(function = name, success, "function executed");
                self.journal_call(call, success.to_string());
                Ok(false)
            }
            ActionOutcome::Located(literal) => {
                tracing::info!(function = name, output = %literal, "Executed Finder");
                let outcome = self.act_on_element(kind, call.element(), &literal).await?;
                self.journal_call(call, outcome);
                Ok(false)
            }
        }
    }

    /// Parse and rescale the finder's box, act at its centre, and tell the
    /// planner where the element was.
    async fn act_on_element(&mut self, kind: ActionKind, element: &str, literal: &str) -> ClickResult<String> {
        self.transition(LoopState::Grounding);
        let bbox: BoundingBox = literal.parse()?;
        if bbox.is_zero() {
            tracing::warn!(element, "finder returned the zero box");
        }

        let finder = self.registry.finder();
        let scaled = finder.rescale(bbox);
        let (cx, cy) = scaled.center();
        let device = finder.device_size();
        if !device.contains((cx, cy)) {
            tracing::warn!(x = cx, y = cy, device = %device, "grounded point is off screen");
        }

        let executor = self.registry.executor();
        let (performed, verb) = if kind == ActionKind::FindElementAndLongPress {
            let ok = executor
                .long_press_at_a_point(cx, cy, None, "Long pressing center")
                .await;
            (ok, "long pressed")
        } else {
            let ok = executor.click_at_a_point(cx, cy, "Clicking center right away").await;
            (ok, "clicked")
        };

        let message = format!("The UI bounds of the {element} is {scaled} and it has been {verb}");
        self.registry
            .planner()
            .append_grounding_message(&mut self.history, &message);
        self.transition(LoopState::Dispatching);
        Ok(format!("{scaled} {performed}"))
    }

    /// Frame screenshots are written to temp files owned by the consumer.
    async fn emit_frame(&self, screenshot: Option<&Screenshot>) -> ClickResult<()> {
        let Some(tx) = &self.frames else {
            return Ok(());
        };
        let screenshot = match screenshot.map(Screenshot::to_frame_ref).transpose() {
            Ok(shot) => shot,
            Err(e) => {
                tracing::warn!(error = %e, "could not materialise frame screenshot");
                None
            }
        };
        let frame = StepFrame {
            step: self.step,
            screenshot,
            observation: self.observation.clone(),
        };
        // a dropped consumer ends the run
        tx.send(frame).await.map_err(|_| ClickError::Cancelled)
    }

    fn transition(&mut self, next: LoopState) {
        tracing::debug!(step = self.step, from = ?self.state, to = ?next, "loop state");
        self.state = next;
    }

    fn journal(&self, entry: JournalEntry) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }

    fn journal_call(&self, call: &PlannedCall, outcome: impl Into<String>) {
        if let Some(name) = call.name.as_deref() {
            self.journal(
                JournalEntry::new(self.step, "action")
                    .action(name, &call.arguments)
                    .outcome(outcome),
            );
        }
    }
}
