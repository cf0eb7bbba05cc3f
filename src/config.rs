use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ClickError, ClickResult};
use crate::executor::coordinator::FrameSize;

const DEFAULT_PLANNER_PROMPT: &str = include_str!("../prompts/planner_system.txt");
const DEFAULT_FINDER_PROMPT: &str = include_str!("../prompts/finder_system.txt");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub task: TaskConfig,
    #[serde(default = "ModelConfig::default_planner")]
    pub planner: ModelConfig,
    #[serde(default = "ModelConfig::default_finder")]
    pub finder: ModelConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            task: TaskConfig::default(),
            planner: ModelConfig::default_planner(),
            finder: ModelConfig::default_finder(),
            executor: ExecutorConfig::default(),
            prompts: PromptsConfig::default(),
        }
    }
}

fn default_platform() -> String {
    "android".into()
}

/// Pacing, deadline and memory settings for a single task run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Pause between capturing a screenshot and asking the planner.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Used when the caller supplies no task text.
    #[serde(default = "default_sample_prompt")]
    pub sample_prompt: String,
    #[serde(default = "default_max_history")]
    pub max_history_messages: usize,
    /// Append every dispatched action to a JSONL session file.
    #[serde(default = "default_true")]
    pub journal: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            timeout_secs: default_timeout_secs(),
            sample_prompt: default_sample_prompt(),
            max_history_messages: default_max_history(),
            journal: true,
        }
    }
}

impl TaskConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs.max(0.0))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_delay_secs() -> f64 {
    1.0
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_sample_prompt() -> String {
    "Open Google News and read the first headline".into()
}

fn default_max_history() -> usize {
    40
}

fn default_true() -> bool {
    true
}

/// One model endpoint. Shared shape for the planner and the finder roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "openai", "anthropic", "gemini" or "ollama".
    pub provider: String,
    pub model: String,
    /// Overrides the provider's default endpoint.
    #[serde(default)]
    pub api_base: Option<String>,
    /// Optional key stored in config.toml (falls back to env vars).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Grounding frame the finder's coordinates are normalized to.
    #[serde(default = "default_frame")]
    pub frame_width: u32,
    #[serde(default = "default_frame")]
    pub frame_height: u32,
}

impl ModelConfig {
    fn default_planner() -> Self {
        Self::for_provider("openai", "gpt-4o")
    }

    fn default_finder() -> Self {
        Self::for_provider("gemini", "gemini-1.5-flash")
    }

    pub fn for_provider(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            api_base: None,
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            frame_width: default_frame(),
            frame_height: default_frame(),
        }
    }

    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.frame_width, self.frame_height)
    }

    /// Resolve the API key for `role` ("planner" or "finder").
    ///
    /// Order: config file, `CLICKCLICKCLICK_<ROLE>_API_KEY`, vendor variable.
    pub fn resolve_api_key(&self, role: &str) -> String {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return key.clone();
        }
        if let Ok(key) = std::env::var(format!("CLICKCLICKCLICK_{}_API_KEY", role.to_uppercase())) {
            return key;
        }
        let vendor_var = match self.provider.to_lowercase().as_str() {
            "openai" => "OPENAI_API_KEY",
            "anthropic" => "ANTHROPIC_API_KEY",
            "gemini" => "GEMINI_API_KEY",
            _ => return String::new(),
        };
        std::env::var(vendor_var).unwrap_or_default()
    }
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_frame() -> u32 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub android: AndroidConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndroidConfig {
    #[serde(default = "default_adb")]
    pub adb_path: String,
    /// Device resolution grounded boxes are rescaled into.
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
    #[serde(default = "default_center_x")]
    pub screen_center_x: i32,
    #[serde(default = "default_center_y")]
    pub screen_center_y: i32,
    #[serde(default = "default_scroll_distance")]
    pub scroll_distance: i32,
    #[serde(default = "default_swipe_distance")]
    pub swipe_distance: i32,
    #[serde(default = "default_long_press_ms")]
    pub long_press_duration_ms: u32,
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            screen_center_x: default_center_x(),
            screen_center_y: default_center_y(),
            scroll_distance: default_scroll_distance(),
            swipe_distance: default_swipe_distance(),
            long_press_duration_ms: default_long_press_ms(),
        }
    }
}

fn default_adb() -> String {
    "adb".into()
}

fn default_screen_width() -> u32 {
    1080
}

fn default_screen_height() -> u32 {
    2400
}

fn default_center_x() -> i32 {
    500
}

fn default_center_y() -> i32 {
    1000
}

fn default_scroll_distance() -> i32 {
    1000
}

fn default_swipe_distance() -> i32 {
    600
}

fn default_long_press_ms() -> u32 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default = "default_planner_prompt")]
    pub planner_system: String,
    #[serde(default = "default_finder_prompt")]
    pub finder_system: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            planner_system: default_planner_prompt(),
            finder_system: default_finder_prompt(),
        }
    }
}

fn default_planner_prompt() -> String {
    DEFAULT_PLANNER_PROMPT.trim().to_string()
}

fn default_finder_prompt() -> String {
    DEFAULT_FINDER_PROMPT.trim().to_string()
}

fn resolve_config_path(explicit: Option<&Path>) -> ClickResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ClickError::Config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(ClickError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn parse_config(content: &str) -> ClickResult<AppConfig> {
    Ok(toml::from_str(content)?)
}

/// Load the config file. An explicit path must exist; otherwise a missing
/// file falls back to built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> ClickResult<AppConfig> {
    let path = match resolve_config_path(explicit) {
        Ok(path) => path,
        Err(e) if explicit.is_none() => {
            tracing::warn!(error = %e, "using built-in default configuration");
            return Ok(AppConfig::default());
        }
        Err(e) => return Err(e),
    };
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(
        path = %path.display(),
        planner = %config.planner.provider,
        finder = %config.finder.provider,
        "config loaded"
    );
    Ok(config)
}

pub fn to_toml(config: &AppConfig) -> ClickResult<String> {
    Ok(toml::to_string_pretty(config)?)
}
