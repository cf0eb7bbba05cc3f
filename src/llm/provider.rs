use async_trait::async_trait;

use crate::errors::ClickResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, ToolDef};

/// Unified LLM provider trait. Each vendor backend implements it independently.
///
/// `messages` may start with a `system` message; providers that carry the
/// system prompt out of band must lift it themselves.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Identifier used in config.toml (`openai`, `anthropic`, ...).
    fn name(&self) -> &str;

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDef>,
        cfg: &CallConfig,
    ) -> ClickResult<LlmResponse>;
}
