//! Chat session — opens one subscription per query and routes its events
//! back to the message slot captured when the query was sent.
//!
//! Stream tasks never touch the history. They forward events over an mpsc
//! channel, and the session applies them in [`ChatSession::next_update`], so
//! the history has exactly one writer.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::StreamError;
use crate::wizard::AnswerMap;

use super::assembler::{Applied, ChatAssembler};
use super::model::{ChatHistory, MessageSlot, MessageStatus};
use super::source::{StreamEvent, StreamSource};

const UPDATE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// A stream that delivers no event for this long is failed and closed.
    pub stream_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ChatConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            stream_timeout: config.stream_timeout,
        }
    }
}

/// Identity of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StreamId(Uuid);

impl StreamId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a message after an event was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatUpdate {
    pub stream_id: StreamId,
    pub slot: MessageSlot,
    pub text: String,
    pub status: MessageStatus,
}

struct Routed {
    stream_id: StreamId,
    event: StreamEvent,
}

/// An open server-push subscription bound to one message slot.
struct Subscription {
    slot: MessageSlot,
    task: JoinHandle<()>,
}

impl Subscription {
    fn close(self) {
        self.task.abort();
    }
}

pub struct ChatSession {
    source: Arc<dyn StreamSource>,
    config: ChatConfig,
    assembler: ChatAssembler,
    context: Option<AnswerMap>,
    subscriptions: HashMap<StreamId, Subscription>,
    events_tx: mpsc::UnboundedSender<Routed>,
    events_rx: mpsc::UnboundedReceiver<Routed>,
    updates: broadcast::Sender<ChatUpdate>,
}

impl ChatSession {
    /// New session whose history starts with the greeting.
    pub fn new(source: Arc<dyn StreamSource>, config: ChatConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates, _rx) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            source,
            config,
            assembler: ChatAssembler::new(ChatHistory::with_greeting()),
            context: None,
            subscriptions: HashMap::new(),
            events_tx,
            events_rx,
            updates,
        }
    }

    /// Attach the answers handed over by the previous stage.
    pub fn with_context(mut self, context: AnswerMap) -> Self {
        self.context = Some(context);
        self
    }

    pub fn context(&self) -> Option<&AnswerMap> {
        self.context.as_ref()
    }

    pub fn history(&self) -> &ChatHistory {
        self.assembler.history()
    }

    /// Number of subscriptions not yet closed.
    pub fn open_streams(&self) -> usize {
        self.subscriptions.len()
    }

    /// Receive every [`ChatUpdate`] as it is applied.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatUpdate> {
        self.updates.subscribe()
    }

    /// Send a query. Blank text is ignored and returns `None`; otherwise the
    /// user message and a placeholder are appended and a new stream is
    /// opened for the placeholder's slot. Earlier streams keep running.
    pub fn send_message(&mut self, text: &str) -> Option<MessageSlot> {
        let slot = self.assembler.begin(text)?;
        let stream_id = StreamId::new();
        let task = tokio::spawn(supervise(
            Arc::clone(&self.source),
            text.trim().to_string(),
            self.config.stream_timeout,
            stream_id,
            self.events_tx.clone(),
        ));
        self.subscriptions.insert(stream_id, Subscription { slot, task });
        info!(
            stream_id = %stream_id,
            slot = %slot,
            source = self.source.name(),
            open = self.subscriptions.len(),
            "Reply stream opened"
        );
        Some(slot)
    }

    /// Apply the next stream event and return the resulting update. Returns
    /// `None` right away when no subscription is open.
    pub async fn next_update(&mut self) -> Option<ChatUpdate> {
        loop {
            if self.subscriptions.is_empty() {
                return None;
            }
            let Routed { stream_id, event } = self.events_rx.recv().await?;
            let Some(slot) = self.subscriptions.get(&stream_id).map(|s| s.slot) else {
                debug!(stream_id = %stream_id, "Event from closed stream dropped");
                continue;
            };

            match self.assembler.apply(slot, event) {
                Applied::Ignored => continue,
                Applied::Updated => {}
                Applied::Closed => {
                    if let Some(subscription) = self.subscriptions.remove(&stream_id) {
                        subscription.close();
                    }
                    debug!(stream_id = %stream_id, slot = %slot, "Reply stream closed");
                }
            }

            let message = self.assembler.history().get(slot)?;
            let update = ChatUpdate {
                stream_id,
                slot,
                text: message.text.clone(),
                status: message.status,
            };
            // Fine if nobody is listening.
            let _ = self.updates.send(update.clone());
            return Some(update);
        }
    }

    /// Drive every open stream to its terminal event.
    pub async fn run_until_idle(&mut self) {
        while self.next_update().await.is_some() {}
    }

    /// Close all open subscriptions. Their messages keep their current text.
    pub fn shutdown(&mut self) {
        let count = self.subscriptions.len();
        for (_, subscription) in self.subscriptions.drain() {
            subscription.close();
        }
        if count > 0 {
            info!(count, "Closed open reply streams");
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Body of a subscription task. A panic inside the source surfaces as a
/// transport error on the slot instead of leaving the subscription open.
async fn supervise(
    source: Arc<dyn StreamSource>,
    query: String,
    timeout: Duration,
    stream_id: StreamId,
    tx: mpsc::UnboundedSender<Routed>,
) {
    let run = AssertUnwindSafe(forward(source, query, timeout, stream_id, tx.clone()));
    if run.catch_unwind().await.is_err() {
        warn!(stream_id = %stream_id, "Reply stream task panicked");
        let event = StreamEvent::Error(StreamError::Transport("stream task panicked".into()));
        let _ = tx.send(Routed { stream_id, event });
    }
}

/// Open the stream and forward its events until a terminal one, a
/// disconnect, or `timeout` without any event.
async fn forward(
    source: Arc<dyn StreamSource>,
    query: String,
    timeout: Duration,
    stream_id: StreamId,
    tx: mpsc::UnboundedSender<Routed>,
) {
    let send = |event: StreamEvent| tx.send(Routed { stream_id, event }).is_ok();
    let timed_out = || {
        warn!(stream_id = %stream_id, ?timeout, "Reply stream timed out");
        send(StreamEvent::Error(StreamError::Timeout { timeout }));
    };

    let mut events = match tokio::time::timeout(timeout, source.open(&query)).await {
        Ok(Ok(events)) => events,
        Ok(Err(e)) => {
            send(StreamEvent::Error(e));
            return;
        }
        Err(_) => return timed_out(),
    };

    loop {
        match tokio::time::timeout(timeout, events.next()).await {
            Ok(Some(event)) => {
                let terminal = event.is_terminal();
                if !send(event) || terminal {
                    return;
                }
            }
            Ok(None) => {
                send(StreamEvent::Error(StreamError::Disconnected));
                return;
            }
            Err(_) => return timed_out(),
        }
    }
}
