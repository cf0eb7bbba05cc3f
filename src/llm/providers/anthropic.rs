use async_trait::async_trait;

use crate::errors::{ClickError, ClickResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::sanitize_for_log;
use crate::llm::types::{
    CallConfig, ChatMessage, ContentPart, FunctionCall, LlmResponse, MessageContent, ToolCall,
    ToolChoice, ToolDef, PNG_DATA_URI_PREFIX,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API. Translates the OpenAI-shaped conversation on the way
/// out and `tool_use` blocks back into `ToolCall`s on the way in.
pub struct AnthropicProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDef>,
        cfg: &CallConfig,
    ) -> ClickResult<LlmResponse> {
        let body = build_request_body(&messages, &tools, cfg);
        tracing::debug!(provider = %self.id, model = %cfg.model, "sending LLM request");
        tracing::debug!(body = %sanitize_for_log(&body), "request body (sanitized, base64 omitted)");

        let response = self
            .client
            .post(&self.api_base)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(ClickError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        let json: serde_json::Value = response.json().await?;
        let parsed = parse_response(&json);
        tracing::info!(
            provider = %self.id,
            content_len = parsed.content.len(),
            tool_calls = parsed.tool_calls.len(),
            "LLM response received"
        );
        Ok(parsed)
    }
}

fn build_request_body(messages: &[ChatMessage], tools: &[ToolDef], cfg: &CallConfig) -> serde_json::Value {
    let mut system = Vec::new();
    let mut converted = Vec::new();
    for msg in messages {
        if msg.role == "system" {
            system.push(flatten_text(&msg.content));
            continue;
        }
        converted.push(serde_json::json!({
            "role": msg.role,
            "content": convert_content(&msg.content),
        }));
    }

    let mut body = serde_json::json!({
        "model": cfg.model,
        "max_tokens": cfg.max_tokens,
        "temperature": cfg.temperature,
        "messages": converted,
    });
    if !system.is_empty() {
        body["system"] = serde_json::Value::String(system.join("\n"));
    }
    if !tools.is_empty() {
        body["tools"] = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.function.name,
                    "description": t.function.description,
                    "input_schema": t.function.parameters,
                })
            })
            .collect();
        body["tool_choice"] = match &cfg.tool_choice {
            ToolChoice::Auto => serde_json::json!({ "type": "auto" }),
            ToolChoice::Any => serde_json::json!({ "type": "any" }),
            ToolChoice::Named(name) => serde_json::json!({ "type": "tool", "name": name }),
        };
    }
    body
}

fn flatten_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn convert_content(content: &MessageContent) -> serde_json::Value {
    match content {
        MessageContent::Text(text) => serde_json::json!([{ "type": "text", "text": text }]),
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => serde_json::json!({ "type": "text", "text": text }),
                ContentPart::ImageUrl { image_url } => {
                    let data = image_url
                        .url
                        .strip_prefix(PNG_DATA_URI_PREFIX)
                        .unwrap_or(&image_url.url);
                    serde_json::json!({
                        "type": "image",
                        "source": { "type": "base64", "media_type": "image/png", "data": data },
                    })
                }
            })
            .collect(),
    }
}

fn parse_response(json: &serde_json::Value) -> LlmResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for block in json["content"].as_array().into_iter().flatten() {
        match block["type"].as_str() {
            Some("text") => content.push_str(block["text"].as_str().unwrap_or("")),
            Some("tool_use") => tool_calls.push(ToolCall {
                id: block["id"].as_str().unwrap_or("").to_string(),
                call_type: "function".into(),
                function: FunctionCall {
                    name: block["name"].as_str().unwrap_or("").to_string(),
                    arguments: block["input"].to_string(),
                },
            }),
            _ => {}
        }
    }
    LlmResponse {
        content,
        tool_calls,
    }
}
