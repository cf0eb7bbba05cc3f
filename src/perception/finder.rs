//! Vision-language grounding adapter.
//!
//! Sends the screenshot plus an element description to any `LlmProvider`,
//! declaring a single `return_coordinates` tool and forcing the model to call
//! it. Whatever goes wrong (transport error, refusal, no tool call, junk
//! arguments) degrades to the zero box so one bad grounding call cannot end
//! the task.
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::{ClickError, ClickResult};
use crate::executor::coordinator::{BoundingBox, FrameSize};
use crate::llm::provider::LlmProvider;
use crate::llm::tools::{return_coordinates_tool, RETURN_COORDINATES};
use crate::llm::types::{CallConfig, ChatMessage, ContentPart, MessageContent};
use crate::perception::screenshot::Screenshot;
use crate::perception::traits::Finder;

pub struct VisionFinder {
    provider: Arc<dyn LlmProvider>,
    call_cfg: CallConfig,
    system_prompt: String,
    frame: FrameSize,
    device: FrameSize,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl VisionFinder {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        call_cfg: CallConfig,
        system_prompt: String,
        frame: FrameSize,
        device: FrameSize,
    ) -> Self {
        Self {
            provider,
            call_cfg,
            system_prompt,
            frame,
            device,
        }
    }

    fn element_prompt(&self, description: &str) -> String {
        format!(
            "Find the UI element described as: \"{description}\". \
             Return its bounding box with integer coordinates normalized to a \
             {w}x{h} frame (x from 0 to {w}, y from 0 to {h}).",
            w = self.frame.width,
            h = self.frame.height,
        )
    }

    async fn try_locate(&self, description: &str, screenshot: &Screenshot) -> ClickResult<BoundingBox> {
        let b64 = screenshot.to_base64_png().await?;
        let messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage {
                role: "user".into(),
                content: MessageContent::Parts(vec![
                    ContentPart::png_base64(&b64),
                    ContentPart::text(self.element_prompt(description)),
                ]),
            },
        ];
        let response = self
            .provider
            .chat(messages, vec![return_coordinates_tool()], &self.call_cfg)
            .await?;

        let call = response
            .tool_calls
            .into_iter()
            .find(|tc| tc.function.name == RETURN_COORDINATES)
            .ok_or_else(|| ClickError::Perception("finder did not call return_coordinates".into()))?;
        let c: Coordinates = serde_json::from_str(&call.function.arguments)?;
        Ok(BoundingBox::new(
            c.xmin.round() as i32,
            c.ymin.round() as i32,
            c.xmax.round() as i32,
            c.ymax.round() as i32,
        ))
    }
}

#[async_trait]
impl Finder for VisionFinder {
    async fn locate(&self, description: &str, screenshot: Option<&Screenshot>) -> String {
        let Some(screenshot) = screenshot else {
            tracing::warn!(element = %description, "no screenshot to ground against");
            return BoundingBox::ZERO.to_string();
        };
        match self.try_locate(description, screenshot).await {
            Ok(bbox) => {
                tracing::info!(element = %description, bbox = %bbox, "element located");
                bbox.to_string()
            }
            Err(e) => {
                tracing::error!(element = %description, error = %e, "grounding failed, using zero box");
                BoundingBox::ZERO.to_string()
            }
        }
    }

    fn frame_size(&self) -> FrameSize {
        self.frame
    }

    fn device_size(&self) -> FrameSize {
        self.device
    }
}
