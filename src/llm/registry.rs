use std::sync::Arc;

use crate::config::ModelConfig;
use crate::errors::{ClickError, ClickResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::anthropic::AnthropicProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::{CallConfig, ToolChoice};
use crate::perception::screenshot::ScreenshotMode;

/// Backends selectable from the `provider` config string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
}

impl ProviderKind {
    pub fn parse(name: &str) -> ClickResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "4o" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ClickError::Config(format!("Unsupported model provider: {other}"))),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1/chat/completions",
            Self::Anthropic => "https://api.anthropic.com/v1/messages",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
            Self::Ollama => "http://localhost:11434/v1/chat/completions",
        }
    }

    /// Model used when only the provider is named on the command line.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Anthropic => "claude-3-5-sonnet-latest",
            Self::Gemini => "gemini-1.5-flash",
            Self::Ollama => "llama3.2-vision",
        }
    }

    /// Screenshot form the executor should produce when this backend plans.
    pub fn screenshot_mode(&self) -> ScreenshotMode {
        match self {
            Self::OpenAi | Self::Anthropic => ScreenshotMode::Base64,
            Self::Gemini | Self::Ollama => ScreenshotMode::TempFile,
        }
    }
}

/// Build the provider and its call settings for one role ("planner" or "finder").
pub fn build_provider(
    role: &str,
    model: &ModelConfig,
    tool_choice: ToolChoice,
) -> ClickResult<(Arc<dyn LlmProvider>, CallConfig)> {
    let kind = ProviderKind::parse(&model.provider)?;
    let api_base = model
        .api_base
        .clone()
        .unwrap_or_else(|| kind.default_api_base().to_string());
    let api_key = model.resolve_api_key(role);
    if api_key.is_empty() && kind != ProviderKind::Ollama {
        tracing::warn!(role, provider = kind.id(), "no API key configured");
    }

    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(kind.id().into(), api_base, api_key)),
        ProviderKind::OpenAi | ProviderKind::Gemini | ProviderKind::Ollama => Arc::new(
            OpenAiCompatibleProvider::new(kind.id().into(), api_base, api_key),
        ),
    };

    tracing::debug!(
        role,
        provider = kind.id(),
        model = %model.model,
        temperature = model.temperature,
        "resolved role config"
    );
    Ok((
        provider,
        CallConfig {
            model: model.model.clone(),
            temperature: model.temperature,
            max_tokens: model.max_tokens,
            tool_choice,
        },
    ))
}
