//! Stream sources — where assistant reply fragments come from.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use reqwest::Url;
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::StreamError;

use super::sse::SseDecoder;

/// Payload that marks normal end of a reply.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded event of a reply stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(String),
    Done,
    Error(StreamError),
}

impl StreamEvent {
    /// Classify a raw event payload.
    pub fn from_data(data: String) -> Self {
        if data == DONE_SENTINEL {
            Self::Done
        } else {
            Self::Fragment(data)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Ordered events of one reply. Ends after the first terminal event.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Opens one server-push subscription per query.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Open a subscription for `query`. Failing to connect is an `Err`;
    /// failures after connecting arrive as [`StreamEvent::Error`].
    async fn open(&self, query: &str) -> Result<EventStream, StreamError>;
}

/// Server-sent-events source over HTTP: `GET {base}/stream?q=<query>`.
pub struct HttpStreamSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpStreamSource {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.stream_url.clone())
    }

    /// Build the subscription URL, percent-encoding the query.
    pub fn stream_url(&self, query: &str) -> Result<Url, StreamError> {
        let mut url = self
            .base
            .join("stream")
            .map_err(|e| StreamError::InvalidUrl(e.to_string()))?;
        url.set_query(Some(&format!("q={}", urlencoding::encode(query))));
        Ok(url)
    }
}

struct BodyState<B> {
    body: Pin<Box<B>>,
    decoder: SseDecoder,
    queued: VecDeque<StreamEvent>,
    finished: bool,
}

/// Turn a raw byte stream into reply events, stopping after the first
/// terminal one. A body that ends without `[DONE]` is a disconnect.
pub fn decode_body<B, C, E>(body: B) -> EventStream
where
    B: Stream<Item = Result<C, E>> + Send + 'static,
    C: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = BodyState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        queued: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.queued.pop_front() {
                if event.is_terminal() {
                    state.finished = true;
                    state.queued.clear();
                }
                return Some((event, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => match state.decoder.feed(chunk.as_ref()) {
                    Ok(payloads) => state
                        .queued
                        .extend(payloads.into_iter().map(StreamEvent::from_data)),
                    Err(e) => state.queued.push_back(StreamEvent::Error(e)),
                },
                Some(Err(e)) => state
                    .queued
                    .push_back(StreamEvent::Error(StreamError::Transport(e.to_string()))),
                None => {
                    if state.decoder.has_partial() {
                        debug!("Discarding unterminated event at end of stream");
                    }
                    state.queued.push_back(StreamEvent::Error(StreamError::Disconnected));
                }
            }
        }
    }))
}

#[async_trait]
impl StreamSource for HttpStreamSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self, query: &str) -> Result<EventStream, StreamError> {
        let url = self.stream_url(query)?;
        debug!(url = %url, "Opening reply stream");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Stream endpoint rejected query");
            return Err(StreamError::Status {
                status: status.as_u16(),
            });
        }

        Ok(decode_body(response.bytes_stream()))
    }
}
