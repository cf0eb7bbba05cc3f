use crate::llm::types::{ChatMessage, ContentPart, MessageContent};

/// Role-tagged message history owned by one task run and threaded through
/// every planning call.
///
/// Invariants:
/// - only the newest image-bearing user turn keeps its image; older image
///   parts are stripped (their text survives) before a new turn is appended;
/// - at most `max_messages` messages are kept besides the system prompt.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    system: Option<ChatMessage>,
    messages: Vec<ChatMessage>,
    max_messages: usize,
}

impl ConversationHistory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            system: None,
            messages: Vec::new(),
            max_messages: max_messages.max(1),
        }
    }

    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(ChatMessage::system(prompt));
        self
    }

    /// Append a user turn carrying the current screenshot.
    pub fn push_user_turn(&mut self, text: Option<String>, image_base64: Option<&str>) {
        self.strip_images();
        let mut parts = Vec::new();
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            parts.push(ContentPart::text(text));
        }
        if let Some(b64) = image_base64.filter(|b| !b.is_empty()) {
            parts.push(ContentPart::png_base64(b64));
        }
        if parts.is_empty() {
            parts.push(ContentPart::text("No screenshot available - device may not be connected"));
        }
        self.push(ChatMessage {
            role: "user".into(),
            content: MessageContent::Parts(parts),
        });
    }

    /// Text-only user turn, e.g. the grounding result for the last action.
    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.push(ChatMessage::user_text(text));
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) {
        self.push(ChatMessage::assistant_text(text));
    }

    /// Full request payload: system prompt first, then the retained turns.
    pub fn to_request(&self) -> Vec<ChatMessage> {
        self.system
            .iter()
            .chain(self.messages.iter())
            .cloned()
            .collect()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn image_count(&self) -> usize {
        self.messages.iter().filter(|m| m.has_image()).count()
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
            tracing::debug!(dropped = excess, "conversation trimmed");
        }
    }

    fn strip_images(&mut self) {
        for msg in self.messages.iter_mut().filter(|m| m.role == "user") {
            if let MessageContent::Parts(parts) = &mut msg.content {
                parts.retain(|p| !p.is_image());
            }
        }
        // image-only turns have nothing left to say
        self.messages.retain(|m| match &m.content {
            MessageContent::Parts(parts) => !parts.is_empty(),
            MessageContent::Text(_) => true,
        });
    }
}
