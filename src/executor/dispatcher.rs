// Action registry: model-selected function name → capability call.
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::{ClickError, ClickResult};
use crate::executor::{Executor, MouseButton};
use crate::perception::traits::Finder;
use crate::planner::Planner;

/// Every function the planner may call. Names must match the declarations in
/// `prompts/tools/actions.json` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Screenshot,
    FindElementAndClick,
    FindElementAndLongPress,
    MoveMouse,
    ClickMouse,
    TypeText,
    DoubleClickMouse,
    RightClickMouse,
    ScrollMouse,
    PressKey,
    ClickAtAPoint,
    LongPressAtAPoint,
    TaskFinished,
    SwipeRight,
    SwipeLeft,
    SwipeUp,
    SwipeDown,
    NavigateBack,
    MinimizeApp,
    VolumeUp,
    VolumeDown,
}

impl ActionKind {
    pub const ALL: [ActionKind; 21] = [
        Self::Screenshot,
        Self::FindElementAndClick,
        Self::FindElementAndLongPress,
        Self::MoveMouse,
        Self::ClickMouse,
        Self::TypeText,
        Self::DoubleClickMouse,
        Self::RightClickMouse,
        Self::ScrollMouse,
        Self::PressKey,
        Self::ClickAtAPoint,
        Self::LongPressAtAPoint,
        Self::TaskFinished,
        Self::SwipeRight,
        Self::SwipeLeft,
        Self::SwipeUp,
        Self::SwipeDown,
        Self::NavigateBack,
        Self::MinimizeApp,
        Self::VolumeUp,
        Self::VolumeDown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::FindElementAndClick => "find_element_and_click",
            Self::FindElementAndLongPress => "find_element_and_long_press",
            Self::MoveMouse => "move_mouse",
            Self::ClickMouse => "click_mouse",
            Self::TypeText => "type_text",
            Self::DoubleClickMouse => "double_click_mouse",
            Self::RightClickMouse => "right_click_mouse",
            Self::ScrollMouse => "scroll_mouse",
            Self::PressKey => "press_key",
            Self::ClickAtAPoint => "click_at_a_point",
            Self::LongPressAtAPoint => "long_press_at_a_point",
            Self::TaskFinished => "task_finished",
            Self::SwipeRight => "swipe_right",
            Self::SwipeLeft => "swipe_left",
            Self::SwipeUp => "swipe_up",
            Self::SwipeDown => "swipe_down",
            Self::NavigateBack => "navigate_back",
            Self::MinimizeApp => "minimize_app",
            Self::VolumeUp => "volume_up",
            Self::VolumeDown => "volume_down",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Grounded actions need the finder before anything touches the device.
    pub fn is_grounded(&self) -> bool {
        matches!(self, Self::FindElementAndClick | Self::FindElementAndLongPress)
    }
}

/// What a dispatched action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Direct device action and its success flag.
    Performed(bool),
    /// Grounded action: bounding-box literal in the finder's frame.
    Located(String),
    /// `task_finished` was called.
    Finished,
}

#[derive(Deserialize)]
struct ObservationArgs {
    #[serde(default)]
    observation: String,
}

#[derive(Deserialize)]
struct PointArgs {
    x: f64,
    y: f64,
    #[serde(default)]
    observation: String,
}

#[derive(Deserialize)]
struct LongPressArgs {
    x: f64,
    y: f64,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    observation: String,
}

#[derive(Deserialize)]
struct TextArgs {
    text: String,
    #[serde(default)]
    observation: String,
}

#[derive(Deserialize)]
struct ScrollArgs {
    clicks: i32,
    #[serde(default)]
    observation: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyList {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct KeysArgs {
    keys: KeyList,
    #[serde(default)]
    observation: String,
}

#[derive(Deserialize)]
struct ElementArgs {
    prompt: String,
}

#[derive(Deserialize)]
struct FinishArgs {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    observation: String,
}

fn parse_args<T: DeserializeOwned>(kind: ActionKind, args: &serde_json::Value) -> ClickResult<T> {
    let value = if args.is_null() {
        serde_json::json!({})
    } else {
        args.clone()
    };
    serde_json::from_value(value).map_err(|e| ClickError::InvalidArguments {
        action: kind.name().to_string(),
        reason: e.to_string(),
    })
}

fn px(v: f64) -> i32 {
    v.round() as i32
}

/// Fixed action table over the three capabilities of one task run.
pub struct ActionRegistry {
    executor: Arc<dyn Executor>,
    planner: Arc<dyn Planner>,
    finder: Arc<dyn Finder>,
}

impl ActionRegistry {
    pub fn new(executor: Arc<dyn Executor>, planner: Arc<dyn Planner>, finder: Arc<dyn Finder>) -> Self {
        Self {
            executor,
            planner,
            finder,
        }
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn planner(&self) -> &Arc<dyn Planner> {
        &self.planner
    }

    pub fn finder(&self) -> &Arc<dyn Finder> {
        &self.finder
    }

    pub fn resolve(&self, name: &str) -> ClickResult<ActionKind> {
        ActionKind::from_name(name).ok_or_else(|| ClickError::UnknownAction(name.to_string()))
    }

    /// Invoke `kind` with the model-supplied arguments.
    ///
    /// Errors only for arguments that do not fit the action's schema; device
    /// and grounding failures come back as degraded outcomes.
    pub async fn invoke(&self, kind: ActionKind, args: &serde_json::Value) -> ClickResult<ActionOutcome> {
        let exec = &self.executor;
        let performed = match kind {
            ActionKind::Screenshot => {
                let a: ObservationArgs = parse_args(kind, args)?;
                exec.screenshot(&a.observation).await.is_some()
            }
            ActionKind::FindElementAndClick | ActionKind::FindElementAndLongPress => {
                let a: ElementArgs = parse_args(kind, args)?;
                let shot = exec.screenshot("Finder took screenshot").await;
                let literal = self.finder.locate(&a.prompt, shot.as_ref()).await;
                return Ok(ActionOutcome::Located(literal));
            }
            ActionKind::MoveMouse => {
                let a: PointArgs = parse_args(kind, args)?;
                exec.move_mouse(px(a.x), px(a.y), &a.observation).await
            }
            ActionKind::ClickMouse => {
                let a: ObservationArgs = parse_args(kind, args)?;
                exec.click_mouse(MouseButton::Left, &a.observation).await
            }
            ActionKind::RightClickMouse => {
                let a: ObservationArgs = parse_args(kind, args)?;
                exec.click_mouse(MouseButton::Right, &a.observation).await
            }
            ActionKind::DoubleClickMouse => {
                let a: ObservationArgs = parse_args(kind, args)?;
                exec.double_click_mouse(&a.observation).await
            }
            ActionKind::TypeText => {
                let a: TextArgs = parse_args(kind, args)?;
                exec.type_text(&a.text, &a.observation).await
            }
            ActionKind::ScrollMouse => {
                let a: ScrollArgs = parse_args(kind, args)?;
                exec.scroll(a.clicks, &a.observation).await
            }
            ActionKind::PressKey => {
                let a: KeysArgs = parse_args(kind, args)?;
                let keys = match a.keys {
                    KeyList::One(key) => vec![key],
                    KeyList::Many(keys) => keys,
                };
                exec.press_key(&keys, &a.observation).await
            }
            ActionKind::ClickAtAPoint => {
                let a: PointArgs = parse_args(kind, args)?;
                exec.click_at_a_point(px(a.x), px(a.y), &a.observation).await
            }
            ActionKind::LongPressAtAPoint => {
                let a: LongPressArgs = parse_args(kind, args)?;
                exec.long_press_at_a_point(px(a.x), px(a.y), a.duration, &a.observation)
                    .await
            }
            ActionKind::TaskFinished => {
                let a: FinishArgs = parse_args(kind, args)?;
                self.planner.finish(&a.reason, &a.observation);
                return Ok(ActionOutcome::Finished);
            }
            ActionKind::SwipeRight => exec.swipe_right(&observation(kind, args)?).await,
            ActionKind::SwipeLeft => exec.swipe_left(&observation(kind, args)?).await,
            ActionKind::SwipeUp => exec.swipe_up(&observation(kind, args)?).await,
            ActionKind::SwipeDown => exec.swipe_down(&observation(kind, args)?).await,
            ActionKind::NavigateBack => exec.navigate_back(&observation(kind, args)?).await,
            ActionKind::MinimizeApp => exec.minimize_app(&observation(kind, args)?).await,
            ActionKind::VolumeUp => exec.volume_up(&observation(kind, args)?).await,
            ActionKind::VolumeDown => exec.volume_down(&observation(kind, args)?).await,
        };
        Ok(ActionOutcome::Performed(performed))
    }
}

fn observation(kind: ActionKind, args: &serde_json::Value) -> ClickResult<String> {
    parse_args::<ObservationArgs>(kind, args).map(|a| a.observation)
}
