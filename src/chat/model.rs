//! Chat history data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown in the assistant bubble until the first fragment arrives.
pub const PLACEHOLDER_TEXT: &str = "Thinking...";

/// Replaces the assistant bubble when its stream fails.
pub const ERROR_NOTICE: &str = "⚠️ Something went wrong!";

/// First message of every conversation.
pub const GREETING: &str =
    "Hi! 👋 I’m your FES Guide. Ask me anything about study abroad, applications, or services.";

/// Canned questions offered next to the input box.
pub const FAQS: [&str; 4] = [
    "How do I apply to universities abroad?",
    "What are the English language requirements?",
    "How can I contact my counsellor?",
    "Scholarship opportunities?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// Lifecycle of a message's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Assistant placeholder, no fragment received yet.
    Pending,
    /// At least one fragment appended; stream still open.
    Streaming,
    /// Final text. User messages are born complete.
    Complete,
    /// Stream failed; text is [`ERROR_NOTICE`].
    Failed,
}

impl MessageStatus {
    /// Whether the text may still change.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Streaming)
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self::new(Sender::User, text, MessageStatus::Complete)
    }

    pub fn assistant(text: &str) -> Self {
        Self::new(Sender::Assistant, text, MessageStatus::Complete)
    }

    pub fn placeholder() -> Self {
        Self::new(Sender::Assistant, PLACEHOLDER_TEXT, MessageStatus::Pending)
    }

    fn new(sender: Sender, text: &str, status: MessageStatus) -> Self {
        Self {
            sender,
            text: text.to_string(),
            status,
            created_at: Utc::now(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.status == MessageStatus::Pending
    }
}

/// Position of a message in the history, captured when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageSlot(pub usize);

impl std::fmt::Display for MessageSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered, append-only message list. Only open assistant messages are
/// rewritten in place, through their slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History seeded with the assistant greeting.
    pub fn with_greeting() -> Self {
        let mut history = Self::new();
        history.push(ChatMessage::assistant(GREETING));
        history
    }

    pub fn push(&mut self, message: ChatMessage) -> MessageSlot {
        self.messages.push(message);
        MessageSlot(self.messages.len() - 1)
    }

    pub fn get(&self, slot: MessageSlot) -> Option<&ChatMessage> {
        self.messages.get(slot.0)
    }

    pub(crate) fn get_mut(&mut self, slot: MessageSlot) -> Option<&mut ChatMessage> {
        self.messages.get_mut(slot.0)
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}
