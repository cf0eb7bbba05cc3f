pub mod android;
pub mod coordinator;
pub mod dispatcher;
pub mod input;
pub mod text_input;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AndroidConfig;
use crate::errors::{ClickError, ClickResult};
use crate::executor::android::AndroidExecutor;
use crate::executor::coordinator::FrameSize;
use crate::perception::screenshot::{Screenshot, ScreenshotMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Device capability: physical input plus screen capture.
///
/// Actions report success as a bool and never return errors; failures are
/// logged inside the implementation. Actions a device cannot perform fall
/// back to the default bodies, which log and return `false`.
#[async_trait]
pub trait Executor: Send + Sync {
    fn screenshot_mode(&self) -> ScreenshotMode;

    /// Native resolution grounded coordinates are mapped to.
    fn device_size(&self) -> FrameSize;

    /// Capture the screen in the configured representation; `None` when the
    /// capture failed.
    async fn screenshot(&self, note: &str) -> Option<Screenshot>;

    async fn move_mouse(&self, _x: i32, _y: i32, _observation: &str) -> bool {
        unsupported("move_mouse")
    }

    async fn click_mouse(&self, _button: MouseButton, _observation: &str) -> bool {
        unsupported("click_mouse")
    }

    async fn double_click_mouse(&self, _observation: &str) -> bool {
        unsupported("double_click_mouse")
    }

    async fn type_text(&self, _text: &str, _observation: &str) -> bool {
        unsupported("type_text")
    }

    /// Positive `clicks` scroll up, negative scroll down.
    async fn scroll(&self, _clicks: i32, _observation: &str) -> bool {
        unsupported("scroll")
    }

    async fn press_key(&self, _keys: &[String], _observation: &str) -> bool {
        unsupported("press_key")
    }

    async fn swipe_left(&self, _observation: &str) -> bool {
        unsupported("swipe_left")
    }

    async fn swipe_right(&self, _observation: &str) -> bool {
        unsupported("swipe_right")
    }

    async fn swipe_up(&self, _observation: &str) -> bool {
        unsupported("swipe_up")
    }

    async fn swipe_down(&self, _observation: &str) -> bool {
        unsupported("swipe_down")
    }

    async fn navigate_back(&self, _observation: &str) -> bool {
        unsupported("navigate_back")
    }

    async fn minimize_app(&self, _observation: &str) -> bool {
        unsupported("minimize_app")
    }

    async fn volume_up(&self, _observation: &str) -> bool {
        unsupported("volume_up")
    }

    async fn volume_down(&self, _observation: &str) -> bool {
        unsupported("volume_down")
    }

    async fn click_at_a_point(&self, x: i32, y: i32, observation: &str) -> bool;

    /// `duration_ms` of `None` uses the executor's configured default.
    async fn long_press_at_a_point(
        &self,
        x: i32,
        y: i32,
        duration_ms: Option<u32>,
        observation: &str,
    ) -> bool;
}

fn unsupported(action: &str) -> bool {
    tracing::warn!(action, "action not available on this device");
    false
}

/// Build the executor for `platform`.
pub fn build_executor(
    platform: &str,
    android: &AndroidConfig,
    mode: ScreenshotMode,
) -> ClickResult<Arc<dyn Executor>> {
    match platform.trim().to_lowercase().as_str() {
        "android" => Ok(Arc::new(AndroidExecutor::new(android.clone(), mode))),
        other => Err(ClickError::Config(format!("Unsupported platform: {other}"))),
    }
}
