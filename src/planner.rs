//! Planning capability: ask a function-calling model which actions to run
//! next, given the task prompt and the current screen.
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent_engine::conversation::ConversationHistory;
use crate::agent_engine::state::PlannedCall;
use crate::config::AppConfig;
use crate::errors::ClickResult;
use crate::executor::coordinator::FrameSize;
use crate::llm::provider::LlmProvider;
use crate::llm::registry::build_provider;
use crate::llm::tools::{load_action_tools, RETURN_COORDINATES};
use crate::llm::types::{CallConfig, ToolChoice, ToolDef};
use crate::perception::finder::VisionFinder;
use crate::perception::screenshot::Screenshot;
use crate::perception::traits::Finder;

#[async_trait]
pub trait Planner: Send + Sync {
    /// Append this step's user turn to `history`, call the model and return
    /// the function calls it chose, in order. Never empty: a step without
    /// calls yields a single [`PlannedCall::none`].
    async fn resolve(
        &self,
        history: &mut ConversationHistory,
        prompt: &str,
        observation: &str,
        screenshot: Option<&Screenshot>,
    ) -> ClickResult<Vec<PlannedCall>>;

    /// Called when the model invokes `task_finished`.
    fn finish(&self, reason: &str, observation: &str) {
        tracing::info!(reason, observation, "task finished");
    }

    /// Inject the loop's synthetic grounding result as a user turn.
    fn append_grounding_message(&self, history: &mut ConversationHistory, text: &str) {
        history.push_user_text(text);
    }
}

/// Planner backed by any [`LlmProvider`] with the embedded action tools.
pub struct LlmPlanner {
    provider: Arc<dyn LlmProvider>,
    call_cfg: CallConfig,
    tools: Vec<ToolDef>,
}

impl LlmPlanner {
    pub fn new(provider: Arc<dyn LlmProvider>, call_cfg: CallConfig) -> ClickResult<Self> {
        Ok(Self {
            provider,
            call_cfg,
            tools: load_action_tools()?,
        })
    }
}

fn user_text(prompt: &str, observation: &str) -> String {
    if observation.is_empty() {
        prompt.to_string()
    } else {
        format!("{prompt}\n\nObservation from your last action: {observation}")
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn resolve(
        &self,
        history: &mut ConversationHistory,
        prompt: &str,
        observation: &str,
        screenshot: Option<&Screenshot>,
    ) -> ClickResult<Vec<PlannedCall>> {
        let image = match screenshot {
            Some(shot) => match shot.to_base64_png().await {
                Ok(b64) => Some(b64),
                Err(e) => {
                    tracing::warn!(error = %e, "screenshot unreadable, planning without it");
                    None
                }
            },
            None => None,
        };
        history.push_user_turn(Some(user_text(prompt, observation)), image.as_deref());

        tracing::info!(
            provider = self.provider.name(),
            messages = history.len(),
            "planning next step"
        );
        let response = match self
            .provider
            .chat(history.to_request(), self.tools.clone(), &self.call_cfg)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "planner request failed");
                return Ok(vec![PlannedCall::none()]);
            }
        };

        if !response.content.is_empty() {
            tracing::debug!(content = %response.content, "planner text");
        }

        let mut calls = Vec::with_capacity(response.tool_calls.len());
        for tc in response.tool_calls {
            let arguments = if tc.function.arguments.trim().is_empty() {
                serde_json::json!({})
            } else {
                match serde_json::from_str(&tc.function.arguments) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(
                            function = %tc.function.name,
                            error = %e,
                            "unparseable tool arguments, passing none"
                        );
                        serde_json::Value::Null
                    }
                }
            };
            history.push_assistant_text(format!(
                "Function: {} with args: {}",
                tc.function.name, arguments
            ));
            calls.push(PlannedCall::new(tc.function.name, arguments));
        }

        if calls.is_empty() {
            tracing::warn!("planner returned no function calls");
            calls.push(PlannedCall::none());
        }
        Ok(calls)
    }
}

/// Planner for `config.planner`, forced to call one of the action tools.
pub fn build_planner(config: &AppConfig) -> ClickResult<Arc<dyn Planner>> {
    let (provider, call_cfg) = build_provider("planner", &config.planner, ToolChoice::Any)?;
    Ok(Arc::new(LlmPlanner::new(provider, call_cfg)?))
}

/// Finder for `config.finder`, mapping onto a `device` of the given size.
pub fn build_finder(config: &AppConfig, device: FrameSize) -> ClickResult<Arc<dyn Finder>> {
    let (provider, call_cfg) = build_provider(
        "finder",
        &config.finder,
        ToolChoice::Named(RETURN_COORDINATES.into()),
    )?;
    Ok(Arc::new(VisionFinder::new(
        provider,
        call_cfg,
        config.prompts.finder_system.clone(),
        config.finder.frame_size(),
        device,
    )))
}
