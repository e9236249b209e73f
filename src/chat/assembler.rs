//! Reply assembly — applies stream events to the message slot they belong to.

use tracing::{debug, warn};

use super::model::{ChatHistory, ChatMessage, ERROR_NOTICE, MessageSlot, MessageStatus};
use super::source::StreamEvent;

/// What applying an event did to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Text changed; the stream stays open.
    Updated,
    /// Terminal event; the subscription must now be closed.
    Closed,
    /// Slot unknown or already final; nothing changed.
    Ignored,
}

/// Owns the chat history and is the only code that mutates it.
#[derive(Debug, Default)]
pub struct ChatAssembler {
    history: ChatHistory,
}

impl ChatAssembler {
    pub fn new(history: ChatHistory) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Append the user's message and an assistant placeholder. Returns the
    /// placeholder's slot, or `None` for blank input (nothing is added).
    pub fn begin(&mut self, text: &str) -> Option<MessageSlot> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.history.push(ChatMessage::user(text));
        let slot = self.history.push(ChatMessage::placeholder());
        debug!(slot = %slot, "Placeholder added");
        Some(slot)
    }

    /// Apply one event to `slot`.
    pub fn apply(&mut self, slot: MessageSlot, event: StreamEvent) -> Applied {
        let Some(message) = self.history.get_mut(slot) else {
            warn!(slot = %slot, "Event for unknown message slot");
            return Applied::Ignored;
        };
        if !message.status.is_open() {
            debug!(slot = %slot, status = %message.status, "Event for finalized message ignored");
            return Applied::Ignored;
        }

        match event {
            StreamEvent::Fragment(fragment) => {
                if message.is_placeholder() {
                    message.text = fragment;
                    message.status = MessageStatus::Streaming;
                } else {
                    message.text.push_str(&fragment);
                }
                Applied::Updated
            }
            StreamEvent::Done => {
                message.status = MessageStatus::Complete;
                Applied::Closed
            }
            StreamEvent::Error(e) => {
                warn!(slot = %slot, error = %e, "Reply stream failed");
                message.text = ERROR_NOTICE.to_string();
                message.status = MessageStatus::Failed;
                Applied::Closed
            }
        }
    }
}
