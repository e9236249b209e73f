//! Streaming chat — turns a free-text query into a live-updating assistant
//! reply read from a server-push stream.

pub mod assembler;
pub mod model;
pub mod session;
pub mod source;
pub mod sse;

pub use assembler::{Applied, ChatAssembler};
pub use model::{
    ChatHistory, ChatMessage, ERROR_NOTICE, FAQS, GREETING, MessageSlot, MessageStatus,
    PLACEHOLDER_TEXT, Sender,
};
pub use session::{ChatConfig, ChatSession, ChatUpdate, StreamId};
pub use source::{DONE_SENTINEL, EventStream, HttpStreamSource, StreamEvent, StreamSource};
