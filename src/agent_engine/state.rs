use serde::{Deserialize, Serialize};

use crate::perception::screenshot::Screenshot;

/// Where the task loop currently is. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Ready,
    Observing,
    Planning,
    Dispatching,
    Grounding,
    Finished,
    Failed,
}

/// Terminal value of a supervised task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// `task_finished` was called.
    Finished,
    /// Interrupted, or an unexpected error ended the loop.
    Failed,
    /// Deadline elapsed before the loop returned; its real state is unknown.
    TimedOut,
}

impl TaskOutcome {
    pub fn from_bool(finished: bool) -> Self {
        if finished {
            Self::Finished
        } else {
            Self::Failed
        }
    }

    /// `Some(true)` / `Some(false)` for a loop that returned, `None` on timeout.
    pub fn as_result(&self) -> Option<bool> {
        match self {
            Self::Finished => Some(true),
            Self::Failed => Some(false),
            Self::TimedOut => None,
        }
    }
}

/// One `(function name, arguments)` pair chosen by the planner.
///
/// `name == None` is the sentinel for "the model called nothing this step".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCall {
    pub name: Option<String>,
    pub arguments: serde_json::Value,
}

impl PlannedCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: Some(name.into()),
            arguments,
        }
    }

    pub fn none() -> Self {
        Self {
            name: None,
            arguments: serde_json::Value::Null,
        }
    }

    pub fn is_none(&self) -> bool {
        self.name.is_none()
    }

    /// The model's `observation` argument, if it supplied one.
    pub fn observation(&self) -> Option<&str> {
        self.arguments.get("observation").and_then(|v| v.as_str())
    }

    /// The model's `prompt` argument (element description for grounded actions).
    pub fn element(&self) -> &str {
        self.arguments
            .get("prompt")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }
}

/// Progress frame emitted by the streaming loop once per iteration, before
/// planning.
#[derive(Debug, Clone)]
pub struct StepFrame {
    pub step: u64,
    /// Renderable reference to this iteration's capture; `None` if it failed.
    pub screenshot: Option<Screenshot>,
    /// Observation from the last dispatched action.
    pub observation: String,
}
