use async_trait::async_trait;

use crate::errors::{ClickError, ClickResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{
    CallConfig, ChatMessage, FunctionCall, LlmResponse, ToolCall, ToolChoice, ToolDef,
};

/// Chat-completions endpoint shared by OpenAI, Gemini's OpenAI surface and Ollama.
pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
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
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDef>,
        cfg: &CallConfig,
    ) -> ClickResult<LlmResponse> {
        let body = build_request_body(&messages, &tools, cfg)?;

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            tools = tools.len(),
            "sending LLM request"
        );
        tracing::debug!(
            body = %sanitize_for_log(&body),
            "request body (sanitized, base64 omitted)"
        );

        let mut request = self.client.post(&self.api_base).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await?;

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
            tools = ?parsed.tool_calls.iter().map(|tc| tc.function.name.as_str()).collect::<Vec<_>>(),
            "LLM response received"
        );
        Ok(parsed)
    }
}

fn build_request_body(
    messages: &[ChatMessage],
    tools: &[ToolDef],
    cfg: &CallConfig,
) -> ClickResult<serde_json::Value> {
    let mut body = serde_json::json!({
        "model": cfg.model,
        "messages": messages,
        "temperature": cfg.temperature,
        "max_tokens": cfg.max_tokens,
    });

    if !tools.is_empty() {
        body["tools"] = serde_json::to_value(tools)?;
        body["tool_choice"] = match &cfg.tool_choice {
            ToolChoice::Auto => serde_json::json!("auto"),
            ToolChoice::Any => serde_json::json!("required"),
            ToolChoice::Named(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            }),
        };
    }
    Ok(body)
}

fn parse_response(json: &serde_json::Value) -> LlmResponse {
    let message = &json["choices"][0]["message"];
    let content = message["content"].as_str().unwrap_or("").to_string();

    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|tc| ToolCall {
                    id: tc["id"].as_str().unwrap_or("").to_string(),
                    call_type: tc["type"].as_str().unwrap_or("function").to_string(),
                    function: FunctionCall {
                        name: tc["function"]["name"].as_str().unwrap_or("").to_string(),
                        // some servers (Ollama) send the arguments as an object
                        arguments: match &tc["function"]["arguments"] {
                            serde_json::Value::String(s) => s.clone(),
                            serde_json::Value::Null => "{}".to_string(),
                            other => other.to_string(),
                        },
                    },
                })
                .filter(|tc| !tc.function.name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    LlmResponse {
        content,
        tool_calls,
    }
}

/// Clone the body with image payloads replaced so it can be logged.
pub(crate) fn sanitize_for_log(body: &serde_json::Value) -> String {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if let Some(url) = part.pointer_mut("/image_url/url") {
                    *url = serde_json::Value::String("<omitted_base64_image>".into());
                }
                if let Some(data) = part.pointer_mut("/source/data") {
                    *data = serde_json::Value::String("<omitted_base64_image>".into());
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ContentPart;

    fn cfg(choice: ToolChoice) -> CallConfig {
        CallConfig {
            model: "gpt-4o".into(),
            temperature: 0.1,
            max_tokens: 256,
            tool_choice: choice,
        }
    }

    #[test]
    fn forced_tool_choice_is_encoded_per_openai_schema() {
        let tools = vec![crate::llm::tools::return_coordinates_tool()];
        let named = build_request_body(&[], &tools, &cfg(ToolChoice::Named("return_coordinates".into())))
            .expect("body");
        assert_eq!(named["tool_choice"]["function"]["name"], "return_coordinates");

        let any = build_request_body(&[], &tools, &cfg(ToolChoice::Any)).expect("body");
        assert_eq!(any["tool_choice"], "required");

        let none = build_request_body(&[], &[], &cfg(ToolChoice::Any)).expect("body");
        assert!(none.get("tool_choice").is_none());
    }

    #[test]
    fn parses_tool_calls_with_string_or_object_arguments() {
        let json = serde_json::json!({
            "choices": [{ "message": {
                "content": null,
                "tool_calls": [
                    { "id": "a", "type": "function",
                      "function": { "name": "swipe_up", "arguments": "{\"observation\":\"home\"}" } },
                    { "id": "b", "type": "function",
                      "function": { "name": "click_at_a_point", "arguments": { "x": 1, "y": 2 } } },
                ]
            }}]
        });
        let parsed = parse_response(&json);
        assert_eq!(parsed.content, "");
        assert_eq!(parsed.tool_calls.len(), 2);
        assert_eq!(parsed.tool_calls[0].function.arguments, "{\"observation\":\"home\"}");
        let args: serde_json::Value =
            serde_json::from_str(&parsed.tool_calls[1].function.arguments).expect("json");
        assert_eq!(args["y"], 2);
    }

    #[test]
    fn log_sanitizer_hides_images() {
        let msg = ChatMessage {
            role: "user".into(),
            content: crate::llm::types::MessageContent::Parts(vec![
                ContentPart::text("goal"),
                ContentPart::png_base64("AAAA"),
            ]),
        };
        let body = build_request_body(&[msg], &[], &cfg(ToolChoice::Auto)).expect("body");
        let logged = sanitize_for_log(&body);
        assert!(logged.contains("<omitted_base64_image>"));
        assert!(!logged.contains("AAAA"));
        assert!(logged.contains("goal"));
    }
}
