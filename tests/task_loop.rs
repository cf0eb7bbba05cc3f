use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use clickclickclick::agent_engine::conversation::ConversationHistory;
use clickclickclick::agent_engine::engine::TaskLoop;
use clickclickclick::agent_engine::event_bus::TaskProgress;
use clickclickclick::agent_engine::loop_control::{supervise, StopFlag};
use clickclickclick::agent_engine::state::{PlannedCall, TaskOutcome};
use clickclickclick::errors::ClickResult;
use clickclickclick::executor::coordinator::FrameSize;
use clickclickclick::executor::dispatcher::ActionRegistry;
use clickclickclick::executor::Executor;
use clickclickclick::llm::types::{ContentPart, MessageContent};
use clickclickclick::perception::screenshot::{Screenshot, ScreenshotMode};
use clickclickclick::perception::traits::Finder;
use clickclickclick::planner::Planner;

/// Records every device action as a short string such as `tap 100,200`.
#[derive(Default)]
struct RecordingExecutor {
    actions: Mutex<Vec<String>>,
    /// Set after the first tap, to simulate a user interrupt mid-step.
    stop_after_tap: Option<StopFlag>,
}

impl RecordingExecutor {
    fn actions(&self) -> Vec<String> {
        self.actions.lock().expect("lock").clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().expect("lock").push(action);
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    fn screenshot_mode(&self) -> ScreenshotMode {
        ScreenshotMode::Base64
    }

    fn device_size(&self) -> FrameSize {
        FrameSize::new(500, 500)
    }

    async fn screenshot(&self, _note: &str) -> Option<Screenshot> {
        // PNG signature; enough for a frame reference
        Some(Screenshot::Base64("iVBORw0KGgo=".into()))
    }

    async fn swipe_up(&self, _observation: &str) -> bool {
        self.record("swipe_up".into());
        true
    }

    async fn click_at_a_point(&self, x: i32, y: i32, _observation: &str) -> bool {
        self.record(format!("tap {x},{y}"));
        if let Some(stop) = &self.stop_after_tap {
            stop.set();
        }
        true
    }

    async fn long_press_at_a_point(&self, x: i32, y: i32, _duration_ms: Option<u32>, _observation: &str) -> bool {
        self.record(format!("long_press {x},{y}"));
        true
    }
}

/// Returns one scripted step per `resolve`, then the empty sentinel.
struct ScriptedPlanner {
    steps: Mutex<VecDeque<Vec<PlannedCall>>>,
    observations: Mutex<Vec<String>>,
    stall: Option<Duration>,
}

impl ScriptedPlanner {
    fn new(steps: Vec<Vec<PlannedCall>>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            observations: Mutex::new(Vec::new()),
            stall: None,
        }
    }

    fn stalling(delay: Duration) -> Self {
        Self {
            stall: Some(delay),
            ..Self::new(Vec::new())
        }
    }

    fn observations(&self) -> Vec<String> {
        self.observations.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn resolve(
        &self,
        history: &mut ConversationHistory,
        prompt: &str,
        observation: &str,
        _screenshot: Option<&Screenshot>,
    ) -> ClickResult<Vec<PlannedCall>> {
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        self.observations.lock().expect("lock").push(observation.to_string());
        history.push_user_text(prompt);
        let step = self.steps.lock().expect("lock").pop_front().unwrap_or_default();
        if step.is_empty() {
            return Ok(vec![PlannedCall::none()]);
        }
        Ok(step)
    }
}

/// Answers every `locate` with the same literal in a 1000×1000 frame.
struct CannedFinder {
    reply: String,
    calls: Mutex<Vec<String>>,
}

impl CannedFinder {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Finder for CannedFinder {
    async fn locate(&self, description: &str, _screenshot: Option<&Screenshot>) -> String {
        self.calls.lock().expect("lock").push(description.to_string());
        self.reply.clone()
    }

    fn frame_size(&self) -> FrameSize {
        FrameSize::new(1000, 1000)
    }

    fn device_size(&self) -> FrameSize {
        FrameSize::new(500, 500)
    }
}

fn call(name: &str, args: serde_json::Value) -> PlannedCall {
    PlannedCall::new(name, args)
}

fn finish() -> PlannedCall {
    call("task_finished", json!({ "reason": "done", "observation": "goal reached" }))
}

fn task_loop(executor: Arc<RecordingExecutor>, planner: Arc<ScriptedPlanner>, finder: Arc<CannedFinder>) -> TaskLoop {
    let registry = ActionRegistry::new(executor, planner, finder);
    TaskLoop::new(registry, ConversationHistory::new(40).with_system("sys"), Duration::ZERO)
}

fn history_texts(task: &TaskLoop) -> Vec<String> {
    task.history()
        .messages()
        .iter()
        .flat_map(|m| match &m.content {
            MessageContent::Text(t) => vec![t.clone()],
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.clone()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect(),
        })
        .collect()
}

#[tokio::test]
async fn direct_tap_needs_no_grounding() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![
        vec![call("click_at_a_point", json!({ "x": 100, "y": 200, "observation": "home" }))],
        vec![finish()],
    ]));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let mut task = task_loop(executor.clone(), planner, finder.clone());

    assert!(task.run("open settings").await);
    assert_eq!(executor.actions(), vec!["tap 100,200"]);
    assert!(finder.calls().is_empty());
}

#[tokio::test]
async fn grounded_click_taps_rescaled_centre_and_reports_bounds() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![
        vec![call("find_element_and_click", json!({ "prompt": "Submit button" }))],
        vec![finish()],
    ]));
    let finder = Arc::new(CannedFinder::new("100,200,300,400"));
    let mut task = task_loop(executor.clone(), planner, finder.clone());

    assert!(task.run("submit the form").await);
    assert_eq!(finder.calls(), vec!["Submit button"]);
    assert_eq!(executor.actions(), vec!["tap 100,150"]);
    assert!(history_texts(&task)
        .contains(&"The UI bounds of the Submit button is 50,100,150,200 and it has been clicked".to_string()));
}

#[tokio::test]
async fn grounded_long_press_uses_long_press() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![vec![
        call("find_element_and_long_press", json!({ "prompt": "photo" })),
        finish(),
    ]]));
    let finder = Arc::new(CannedFinder::new("100,200,300,400"));
    let mut task = task_loop(executor.clone(), planner, finder);

    assert!(task.run("select the photo").await);
    assert_eq!(executor.actions(), vec!["long_press 100,150"]);
    assert!(history_texts(&task).iter().any(|t| t.ends_with("and it has been long pressed")));
}

#[tokio::test]
async fn malformed_grounding_output_touches_nothing() {
    for reply in ["a,b,c", "1,2,3", "1,2,3,x", ""] {
        let executor = Arc::new(RecordingExecutor::default());
        let planner = Arc::new(ScriptedPlanner::new(vec![
            vec![call("find_element_and_click", json!({ "prompt": "Submit button" }))],
            vec![finish()],
        ]));
        let finder = Arc::new(CannedFinder::new(reply));
        let mut task = task_loop(executor.clone(), planner, finder);

        assert!(task.run("submit").await, "loop must survive {reply:?}");
        assert!(executor.actions().is_empty(), "no device action for {reply:?}");
        assert!(!history_texts(&task).iter().any(|t| t.starts_with("The UI bounds")));
    }
}

#[tokio::test]
async fn task_finished_halts_the_rest_of_the_step() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![vec![
        call("click_at_a_point", json!({ "x": 1, "y": 1 })),
        finish(),
        call("click_at_a_point", json!({ "x": 2, "y": 2 })),
    ]]));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let mut task = task_loop(executor.clone(), planner, finder);

    assert!(task.run("tap once").await);
    assert_eq!(executor.actions(), vec!["tap 1,1"]);
}

#[tokio::test]
async fn empty_step_is_a_no_op() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![Vec::new(), Vec::new(), vec![finish()]]));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let mut task = task_loop(executor.clone(), planner.clone(), finder);

    assert!(task.run("wait").await);
    assert_eq!(planner.observations().len(), 3);
    assert!(executor.actions().is_empty());
}

#[tokio::test]
async fn unknown_and_invalid_calls_are_skipped() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![
        vec![
            call("apple_script", json!({ "script": "beep" })),
            call("click_at_a_point", json!({ "x": "left" })),
            call("swipe_up", json!({})),
        ],
        vec![finish()],
    ]));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let mut task = task_loop(executor.clone(), planner, finder);

    assert!(task.run("scroll").await);
    assert_eq!(executor.actions(), vec!["swipe_up"]);
}

#[tokio::test]
async fn observation_reaches_the_next_plan_once() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![
        vec![call("swipe_up", json!({ "observation": "list scrolled" }))],
        Vec::new(),
        vec![finish()],
    ]));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let mut task = task_loop(executor, planner.clone(), finder);

    assert!(task.run("scroll").await);
    assert_eq!(planner.observations(), vec!["", "list scrolled", ""]);
}

#[tokio::test]
async fn interrupt_stops_with_failure() {
    let stop = StopFlag::new();
    let executor = Arc::new(RecordingExecutor {
        stop_after_tap: Some(stop.clone()),
        ..Default::default()
    });
    let planner = Arc::new(ScriptedPlanner::new(vec![
        vec![
            call("click_at_a_point", json!({ "x": 1, "y": 1 })),
            call("click_at_a_point", json!({ "x": 2, "y": 2 })),
        ],
        vec![finish()],
    ]));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let mut task = task_loop(executor.clone(), planner, finder).with_stop_flag(stop);

    assert!(!task.run("tap").await);
    assert_eq!(executor.actions(), vec!["tap 1,1"]);
}

#[tokio::test]
async fn supervisor_reports_finished_loop() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![vec![finish()]]));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let mut task = task_loop(executor, planner, finder);

    let outcome = supervise(Duration::from_secs(5), async move { task.run("done").await }).await;
    assert_eq!(outcome, TaskOutcome::Finished);
}

#[tokio::test]
async fn stalled_planner_times_out() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::stalling(Duration::from_secs(30)));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let mut task = task_loop(executor, planner, finder);

    let outcome = supervise(Duration::from_millis(100), async move { task.run("never").await }).await;
    assert_eq!(outcome, TaskOutcome::TimedOut);
    assert_eq!(outcome.as_result(), None);
}

#[tokio::test]
async fn streaming_emits_one_frame_per_step() {
    let executor = Arc::new(RecordingExecutor::default());
    let planner = Arc::new(ScriptedPlanner::new(vec![
        vec![call("click_at_a_point", json!({ "x": 3, "y": 4, "observation": "menu open" }))],
        vec![finish()],
    ]));
    let finder = Arc::new(CannedFinder::new("0,0,0,0"));
    let task = task_loop(executor.clone(), planner, finder);

    let mut progress = TaskProgress::spawn(task, "open menu".into(), Duration::from_secs(5));
    let mut frames = Vec::new();
    while let Some(frame) = progress.next_frame().await {
        frames.push(frame);
    }
    assert_eq!(progress.outcome().await, TaskOutcome::Finished);

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].observation, "");
    assert_eq!(frames[1].observation, "menu open");
    let path = frames[0]
        .screenshot
        .as_ref()
        .and_then(|s| s.path())
        .expect("frame screenshot is a file");
    assert!(path.exists());
    assert_eq!(executor.actions(), vec!["tap 3,4"]);

    for frame in &frames {
        if let Some(path) = frame.screenshot.as_ref().and_then(|s| s.path()) {
            let _ = std::fs::remove_file(path);
        }
    }
    assert!(!path.exists());
}
