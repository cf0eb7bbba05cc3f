use crate::agent_engine::conversation::ConversationHistory;
use crate::agent_engine::engine::TaskLoop;
use crate::agent_engine::event_bus::TaskProgress;
use crate::agent_engine::history::SessionHistory;
use crate::agent_engine::loop_control::{supervise, StopFlag};
use crate::agent_engine::state::{StepFrame, TaskOutcome};
use crate::config::{to_toml, AppConfig, ModelConfig};
use crate::errors::ClickResult;
use crate::executor::build_executor;
use crate::executor::dispatcher::ActionRegistry;
use crate::llm::registry::ProviderKind;
use crate::perception::screenshot::Screenshot;
use crate::planner::{build_finder, build_planner};

/// Command-line overrides for one `run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub task: Option<String>,
    pub platform: Option<String>,
    /// `provider` or `provider/model`.
    pub planner_model: Option<String>,
    pub finder_model: Option<String>,
    pub stream: bool,
}

pub fn apply_overrides(config: &mut AppConfig, opts: &RunOptions) -> ClickResult<()> {
    if let Some(platform) = &opts.platform {
        config.platform = platform.clone();
    }
    if let Some(value) = &opts.planner_model {
        override_model(&mut config.planner, value)?;
    }
    if let Some(value) = &opts.finder_model {
        override_model(&mut config.finder, value)?;
    }
    Ok(())
}

fn override_model(model: &mut ModelConfig, value: &str) -> ClickResult<()> {
    let (provider, name) = match value.split_once('/') {
        Some((provider, name)) => (provider, Some(name)),
        None => (value, None),
    };
    let kind = ProviderKind::parse(provider)?;
    if !model.provider.eq_ignore_ascii_case(kind.id()) {
        // endpoint and key belonged to the previous provider
        model.api_base = None;
        model.api_key = None;
    }
    model.provider = kind.id().into();
    model.model = name.unwrap_or(kind.default_model()).to_string();
    Ok(())
}

/// Wire config into a ready-to-run task loop.
///
/// The planner backend decides the screenshot form, the executor decides the
/// device size the finder maps onto.
pub fn build_task(config: &AppConfig, stop: StopFlag) -> ClickResult<TaskLoop> {
    let planner_kind = ProviderKind::parse(&config.planner.provider)?;
    let executor = build_executor(
        &config.platform,
        &config.executor.android,
        planner_kind.screenshot_mode(),
    )?;
    let planner = build_planner(config)?;
    let finder = build_finder(config, executor.device_size())?;
    tracing::info!(
        platform = %config.platform,
        planner = %config.planner.model,
        finder = %config.finder.model,
        device = %executor.device_size(),
        "task components ready"
    );

    let registry = ActionRegistry::new(executor, planner, finder);
    let history = ConversationHistory::new(config.task.max_history_messages)
        .with_system(config.prompts.planner_system.clone());
    let mut task = TaskLoop::new(registry, history, config.task.delay()).with_stop_flag(stop);
    if config.task.journal {
        let journal = SessionHistory::new();
        tracing::info!(session = %journal.session_id, path = %journal.path().display(), "journaling session");
        task = task.with_journal(journal);
    }
    Ok(task)
}

/// `run`: execute one task under the timeout supervisor and print `true`,
/// `false`, or nothing when the deadline passed.
pub async fn run_task(mut config: AppConfig, opts: RunOptions) -> ClickResult<TaskOutcome> {
    apply_overrides(&mut config, &opts)?;
    let prompt = opts
        .task
        .clone()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| config.task.sample_prompt.clone());

    let stop = StopFlag::new();
    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after the current action");
            on_interrupt.set();
        }
    });

    let task = build_task(&config, stop)?;
    let timeout = config.task.timeout();
    let outcome = if opts.stream {
        let mut progress = TaskProgress::spawn(task, prompt, timeout);
        while let Some(frame) = progress.next_frame().await {
            println!("{}", describe_frame(&frame));
        }
        progress.outcome().await
    } else {
        let mut task = task;
        supervise(timeout, async move { task.run(&prompt).await }).await
    };

    if let Some(result) = outcome.as_result() {
        println!("{result}");
    }
    Ok(outcome)
}

/// `config`: print the effective configuration.
pub fn show_config(config: &AppConfig) -> ClickResult<()> {
    print!("{}", to_toml(&redacted(config))?);
    Ok(())
}

/// Copy of `config` with API keys masked, for printing.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    for model in [&mut shown.planner, &mut shown.finder] {
        if model.api_key.is_some() {
            model.api_key = Some("<redacted>".into());
        }
    }
    shown
}

fn describe_frame(frame: &StepFrame) -> String {
    let screenshot = match &frame.screenshot {
        Some(Screenshot::TempFile(path)) => path.display().to_string(),
        Some(Screenshot::Image(img)) => format!("<image {}x{}>", img.width(), img.height()),
        Some(Screenshot::Base64(b64)) => format!("<base64 png, {} chars>", b64.len()),
        None => "<no screenshot>".into(),
    };
    if frame.observation.is_empty() {
        format!("[step {}] {screenshot}", frame.step)
    } else {
        format!("[step {}] {screenshot} | {}", frame.step, frame.observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_override_resets_endpoint_and_picks_default_model() {
        let mut config = AppConfig::default();
        config.planner.api_key = Some("sk-openai".into());
        apply_overrides(
            &mut config,
            &RunOptions {
                planner_model: Some("anthropic".into()),
                finder_model: Some("ollama/llava".into()),
                platform: Some("android".into()),
                ..Default::default()
            },
        )
        .expect("valid overrides");
        assert_eq!(config.planner.provider, "anthropic");
        assert_eq!(config.planner.model, "claude-3-5-sonnet-latest");
        assert_eq!(config.planner.api_key, None);
        assert_eq!(config.finder.provider, "ollama");
        assert_eq!(config.finder.model, "llava");
    }

    #[test]
    fn printed_config_masks_api_keys() {
        let mut config = AppConfig::default();
        config.planner.api_key = Some("sk-planner-secret".into());
        config.finder.api_key = Some("sk-finder-secret".into());
        let text = to_toml(&redacted(&config)).expect("serializes");
        assert!(!text.contains("sk-planner-secret"));
        assert!(!text.contains("sk-finder-secret"));
        assert!(text.contains("<redacted>"));
        assert_eq!(config.planner.api_key.as_deref(), Some("sk-planner-secret"));
    }

    #[test]
    fn same_provider_override_keeps_key() {
        let mut config = AppConfig::default();
        config.planner.api_key = Some("sk-openai".into());
        override_model(&mut config.planner, "openai/gpt-4o-mini").expect("valid");
        assert_eq!(config.planner.model, "gpt-4o-mini");
        assert_eq!(config.planner.api_key.as_deref(), Some("sk-openai"));
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let mut config = AppConfig::default();
        config.platform = "windows".into();
        config.task.journal = false;
        assert!(build_task(&config, StopFlag::new()).is_err());
    }

    #[test]
    fn frame_description_includes_observation() {
        let frame = StepFrame {
            step: 3,
            screenshot: None,
            observation: "settings opened".into(),
        };
        assert_eq!(describe_frame(&frame), "[step 3] <no screenshot> | settings opened");
    }
}
