use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::AndroidConfig;
use crate::errors::{ClickError, ClickResult};
use crate::executor::coordinator::FrameSize;
use crate::executor::input::{self, Gesture};
use crate::executor::text_input::{self, TextChunk};
use crate::executor::{Executor, MouseButton};
use crate::perception::screenshot::{Screenshot, ScreenshotMode};

/// Timeout for a single adb invocation.
const ADB_TIMEOUT: Duration = Duration::from_secs(15);

/// Runs one adb invocation and returns its stdout.
#[async_trait]
pub trait AdbRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> ClickResult<Vec<u8>>;
}

/// Spawns the real `adb` binary.
pub struct AdbCommand {
    adb_path: String,
}

impl AdbCommand {
    pub fn new(adb_path: String) -> Self {
        Self { adb_path }
    }
}

#[async_trait]
impl AdbRunner for AdbCommand {
    async fn run(&self, args: &[String]) -> ClickResult<Vec<u8>> {
        let output = tokio::time::timeout(
            ADB_TIMEOUT,
            tokio::process::Command::new(&self.adb_path)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            ClickError::Executor(format!(
                "adb {} timed out after {}s",
                args.join(" "),
                ADB_TIMEOUT.as_secs()
            ))
        })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClickError::Executor(format!(
                "adb {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// Android device driven through `adb shell input`.
pub struct AndroidExecutor {
    cfg: AndroidConfig,
    mode: ScreenshotMode,
    adb: Arc<dyn AdbRunner>,
}

impl AndroidExecutor {
    pub fn new(cfg: AndroidConfig, mode: ScreenshotMode) -> Self {
        let adb = Arc::new(AdbCommand::new(cfg.adb_path.clone()));
        Self::with_runner(cfg, mode, adb)
    }

    pub fn with_runner(cfg: AndroidConfig, mode: ScreenshotMode, adb: Arc<dyn AdbRunner>) -> Self {
        Self { cfg, mode, adb }
    }

    /// Run each command in order, stopping at the first failure.
    async fn run_all(&self, action: &str, commands: Vec<Vec<String>>) -> bool {
        for args in commands {
            if let Err(e) = self.adb.run(&args).await {
                tracing::error!(action, error = %e, "adb command failed");
                return false;
            }
        }
        true
    }

    async fn run_one(&self, action: &str, args: Vec<String>) -> bool {
        self.run_all(action, vec![args]).await
    }
}

#[async_trait]
impl Executor for AndroidExecutor {
    fn screenshot_mode(&self) -> ScreenshotMode {
        self.mode
    }

    fn device_size(&self) -> FrameSize {
        FrameSize::new(self.cfg.screen_width, self.cfg.screen_height)
    }

    async fn screenshot(&self, note: &str) -> Option<Screenshot> {
        tracing::debug!(note, mode = ?self.mode, "take a screenshot");
        let png = match self.adb.run(&input::screencap()).await {
            Ok(png) => png,
            Err(e) => {
                tracing::error!(error = %e, "screencap failed");
                return None;
            }
        };
        match Screenshot::from_png(&png, self.mode) {
            Ok(shot) => Some(shot),
            Err(e) => {
                tracing::error!(error = %e, bytes = png.len(), "screencap returned an unreadable image");
                None
            }
        }
    }

    async fn move_mouse(&self, x: i32, y: i32, observation: &str) -> bool {
        tracing::debug!(x, y, observation, "move mouse");
        self.run_one("move_mouse", input::tap(x, y)).await
    }

    async fn click_mouse(&self, button: MouseButton, _observation: &str) -> bool {
        tracing::warn!(?button, "click mouse is not available on android");
        false
    }

    async fn double_click_mouse(&self, _observation: &str) -> bool {
        tracing::warn!("double click mouse is not available on android");
        false
    }

    async fn type_text(&self, text: &str, observation: &str) -> bool {
        tracing::debug!(text, observation, "type text");
        if text_input::contains_cjk(text) {
            tracing::warn!("adb input text cannot deliver CJK characters; they will be dropped");
        }
        let commands = text_input::chunks(text)
            .into_iter()
            .map(|chunk| match chunk {
                TextChunk::Text(sanitized) => input::text(sanitized),
                TextChunk::Enter => input::keyevent(input::KEYCODE_ENTER),
            })
            .collect();
        self.run_all("type_text", commands).await
    }

    async fn scroll(&self, clicks: i32, observation: &str) -> bool {
        tracing::debug!(clicks, observation, "scroll");
        let direction = if clicks > 0 { Gesture::Up } else { Gesture::Down };
        self.run_one("scroll", input::gesture(&self.cfg, direction)).await
    }

    async fn press_key(&self, keys: &[String], observation: &str) -> bool {
        tracing::debug!(?keys, observation, "press keys");
        let commands = keys
            .iter()
            .map(|key| input::keyevent(&key.to_uppercase()))
            .collect();
        self.run_all("press_key", commands).await
    }

    async fn swipe_left(&self, _observation: &str) -> bool {
        tracing::debug!("swipe left");
        self.run_one("swipe_left", input::gesture(&self.cfg, Gesture::Left)).await
    }

    async fn swipe_right(&self, _observation: &str) -> bool {
        tracing::debug!("swipe right");
        self.run_one("swipe_right", input::gesture(&self.cfg, Gesture::Right)).await
    }

    async fn swipe_up(&self, _observation: &str) -> bool {
        tracing::debug!("swipe up");
        self.run_one("swipe_up", input::gesture(&self.cfg, Gesture::Up)).await
    }

    async fn swipe_down(&self, _observation: &str) -> bool {
        tracing::debug!("swipe down");
        self.run_one("swipe_down", input::gesture(&self.cfg, Gesture::Down)).await
    }

    async fn navigate_back(&self, _observation: &str) -> bool {
        tracing::debug!("navigate back");
        self.run_one("navigate_back", input::keyevent(input::KEYCODE_BACK)).await
    }

    async fn minimize_app(&self, _observation: &str) -> bool {
        tracing::debug!("minimize app");
        self.run_one("minimize_app", input::keyevent(input::KEYCODE_HOME)).await
    }

    async fn volume_up(&self, _observation: &str) -> bool {
        tracing::debug!("volume up");
        self.run_one("volume_up", input::keyevent(input::KEYCODE_VOLUME_UP)).await
    }

    async fn volume_down(&self, _observation: &str) -> bool {
        tracing::debug!("volume down");
        self.run_one("volume_down", input::keyevent(input::KEYCODE_VOLUME_DOWN)).await
    }

    async fn click_at_a_point(&self, x: i32, y: i32, observation: &str) -> bool {
        tracing::debug!(x, y, observation, "click at a point");
        self.run_one("click_at_a_point", input::tap(x, y)).await
    }

    async fn long_press_at_a_point(
        &self,
        x: i32,
        y: i32,
        duration_ms: Option<u32>,
        observation: &str,
    ) -> bool {
        let duration = duration_ms.unwrap_or(self.cfg.long_press_duration_ms);
        tracing::debug!(x, y, duration, observation, "long press at a point");
        self.run_one("long_press_at_a_point", input::long_press(x, y, duration)).await
    }
}
