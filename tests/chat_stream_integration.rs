//! Integration tests for the HTTP reply stream + chat session.
//!
//! Each test spins up an Axum server on a random port that speaks
//! `text/event-stream`, and drives the real `HttpStreamSource` against it.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::Query;
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::{StreamExt, stream};
use reqwest::Url;
use tokio::net::TcpListener;
use tokio::time::timeout;

use edu_reco::chat::{
    ChatConfig, ChatSession, ERROR_NOTICE, HttpStreamSource, MessageSlot, MessageStatus,
    StreamEvent, StreamSource,
};
use edu_reco::error::StreamError;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn raw_body(chunks: Vec<String>) -> Response {
    let body = Body::from_stream(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)));
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn chunks(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Replies keyed by the `q` parameter; unknown queries are echoed back.
async fn stream_handler(Query(params): Query<HashMap<String, String>>) -> Response {
    let query = params.get("q").cloned().unwrap_or_default();
    match query.as_str() {
        "hello" => raw_body(chunks(&[
            "data: Hello\n\n",
            "data:  world\n\n",
            "data: [DONE]\n\n",
        ])),
        "chunked" => raw_body(chunks(&[
            "da",
            "ta: Hel",
            "lo\r\n\r",
            "\n: comment\n\ndata:  wor",
            "ld\n\ndata: [DO",
            "NE]\n\n",
        ])),
        "sse" => {
            let events = ["Hel", "lo wor", "ld", "[DONE]"]
                .into_iter()
                .map(|d| Ok::<_, Infallible>(Event::default().data(d)));
            Sse::new(stream::iter(events)).into_response()
        }
        "named" => {
            let events = vec![
                Event::default().event("ping").data("keepalive"),
                Event::default().data("Hi"),
                Event::default().event("message").data(" there"),
                Event::default().data("[DONE]"),
            ];
            Sse::new(stream::iter(events.into_iter().map(Ok::<_, Infallible>))).into_response()
        }
        "bom" => raw_body(chunks(&["\u{feff}data: Hello\n\n", "data: [DONE]\n\n"])),
        "fail" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "drop" => raw_body(chunks(&["data: partial\n\n"])),
        "hang" => {
            let body = stream::iter(vec![Ok::<_, Infallible>("data: wait\n\n".to_string())])
                .chain(stream::pending());
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(body),
            )
                .into_response()
        }
        other => raw_body(vec![format!("data: {other}\n\n"), "data: [DONE]\n\n".to_string()]),
    }
}

/// Start an Axum server on a random port, return its base URL.
async fn start_server() -> Url {
    let app = Router::new().route("/stream", get(stream_handler));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
}

/// Talk to the local test server directly, whatever proxy the environment sets.
fn http_source(base: Url) -> HttpStreamSource {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpStreamSource::with_client(client, base)
}

fn session(base: Url, stream_timeout: Duration) -> ChatSession {
    let source: Arc<dyn StreamSource> = Arc::new(http_source(base));
    ChatSession::new(source, ChatConfig { stream_timeout })
}

/// Send one query, drive it to completion, return (slot, final text).
async fn ask(chat: &mut ChatSession, query: &str) -> (MessageSlot, String) {
    let slot = chat.send_message(query).expect("query should not be blank");
    chat.run_until_idle().await;
    let text = chat.history().get(slot).unwrap().text.clone();
    (slot, text)
}

#[tokio::test]
async fn hello_world_streams_to_completion() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_secs(5));
        let (slot, text) = ask(&mut chat, "hello").await;

        assert_eq!(text, "Hello world");
        assert_eq!(chat.history().get(slot).unwrap().status, MessageStatus::Complete);
        assert_eq!(chat.open_streams(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn events_split_across_chunks_are_reassembled() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_secs(5));
        let (_, text) = ask(&mut chat, "chunked").await;
        assert_eq!(text, "Hello world");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn axum_sse_responses_are_understood() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_secs(5));
        let (_, text) = ask(&mut chat, "sse").await;
        assert_eq!(text, "Hello world");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn named_events_stay_out_of_the_reply() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_secs(5));
        let (_, text) = ask(&mut chat, "named").await;
        assert_eq!(text, "Hi there");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn leading_byte_order_mark_keeps_first_fragment() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_secs(5));
        let (slot, text) = ask(&mut chat, "bom").await;
        assert_eq!(text, "Hello");
        assert_eq!(chat.history().get(slot).unwrap().status, MessageStatus::Complete);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn query_is_percent_encoded_on_the_wire() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_secs(5));
        let (_, text) = ask(&mut chat, "  UK & Canada? 100% #1  ").await;
        assert_eq!(text, "UK & Canada? 100% #1");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn server_error_shows_notice() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server().await;
        let source = http_source(base.clone());
        let err = source.open("fail").await.err().unwrap();
        assert_eq!(err, StreamError::Status { status: 500 });

        let mut chat = session(base, Duration::from_secs(5));
        let (slot, text) = ask(&mut chat, "fail").await;
        assert_eq!(text, ERROR_NOTICE);
        assert_eq!(chat.history().get(slot).unwrap().status, MessageStatus::Failed);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn body_ending_without_done_shows_notice() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server().await;
        let events: Vec<StreamEvent> = http_source(base.clone())
            .open("drop")
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Fragment("partial".to_string()),
                StreamEvent::Error(StreamError::Disconnected),
            ]
        );

        let mut chat = session(base, Duration::from_secs(5));
        let (_, text) = ask(&mut chat, "drop").await;
        assert_eq!(text, ERROR_NOTICE);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn silent_server_times_out() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_millis(300));
        let (slot, text) = ask(&mut chat, "hang").await;
        assert_eq!(text, ERROR_NOTICE);
        assert_eq!(chat.history().get(slot).unwrap().status, MessageStatus::Failed);
        assert_eq!(chat.open_streams(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unreachable_endpoint_shows_notice() {
    timeout(TEST_TIMEOUT, async {
        // Grab a free port, then close it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let base = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let mut chat = session(base, Duration::from_secs(5));
        let (_, text) = ask(&mut chat, "hello").await;
        assert_eq!(text, ERROR_NOTICE);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sequential_queries_each_get_their_own_reply() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_secs(5));
        let (first, _) = ask(&mut chat, "hello").await;
        let (second, _) = ask(&mut chat, "fail").await;
        let (third, _) = ask(&mut chat, "echo me").await;

        assert_eq!(chat.history().get(first).unwrap().text, "Hello world");
        assert_eq!(chat.history().get(second).unwrap().text, ERROR_NOTICE);
        assert_eq!(chat.history().get(third).unwrap().text, "echo me");
        // Greeting plus three question/answer pairs.
        assert_eq!(chat.history().len(), 7);
        assert_eq!(chat.open_streams(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn concurrent_queries_do_not_cross_talk() {
    timeout(TEST_TIMEOUT, async {
        let mut chat = session(start_server().await, Duration::from_secs(5));
        let slow = chat.send_message("hello").unwrap();
        let other = chat.send_message("second question").unwrap();
        chat.run_until_idle().await;

        assert_eq!(chat.history().get(slow).unwrap().text, "Hello world");
        assert_eq!(chat.history().get(other).unwrap().text, "second question");
    })
    .await
    .expect("test timed out");
}
