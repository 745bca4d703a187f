//! Mock upstream for integration tests
//!
//! Answers every path: `.../invoke` speaks the Bedrock text completion
//! format, anything else the OpenAI-compatible chat completion format.
//! Every request is recorded for later inspection.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

/// Text the streamed answers are split from
pub const STREAMED_TEXT: &[&str] = &["Hel", "lo", " world"];

/// Completion text of synchronous answers
pub const COMPLETION_TEXT: &str = "Hello from the mock.";

/// How the mock answers
#[derive(Debug, Clone)]
pub struct Behavior {
    /// Status of every answer; non-2xx answers carry a JSON error body
    pub status: StatusCode,
    /// Wait before sending response headers
    pub header_delay: Duration,
    /// Wait between streamed chunks
    pub chunk_delay: Duration,
    /// End the stream in the middle of an event after two chunks
    pub truncate: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            header_delay: Duration::ZERO,
            chunk_delay: Duration::ZERO,
            truncate: false,
        }
    }
}

/// A request as the mock received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

struct MockState {
    behavior: Behavior,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockUpstream {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(Behavior::default()).await
    }

    pub async fn start_with(behavior: Behavior) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            behavior,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for a direct OpenAI-compatible backend
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Host to configure as `aigateway.base_url`
    pub fn gateway_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("mock received no request")
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    let is_bedrock = uri.path().ends_with("/invoke");
    let streaming = if is_bedrock {
        headers
            .get(ACCEPT)
            .is_some_and(|v| v == "application/vnd.amazon.eventstream")
    } else {
        body["stream"] == true
    };
    let model = if is_bedrock {
        uri.path().rsplit('/').nth(1).unwrap_or_default().to_owned()
    } else {
        body["model"].as_str().unwrap_or_default().to_owned()
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        headers,
        body,
    });

    let behavior = state.behavior.clone();
    if !behavior.header_delay.is_zero() {
        tokio::time::sleep(behavior.header_delay).await;
    }

    if !behavior.status.is_success() {
        let error = serde_json::json!({ "error": { "message": "mock failure", "type": "server_error" } });
        return (behavior.status, axum::Json(error)).into_response();
    }

    match (is_bedrock, streaming) {
        (false, false) => axum::Json(keyed_response(&model)).into_response(),
        (true, false) => axum::Json(bedrock_response()).into_response(),
        (false, true) => sse_response(keyed_events(&model), &behavior),
        (true, true) => sse_response(bedrock_events(), &behavior),
    }
}

fn keyed_response(model: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": COMPLETION_TEXT },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 9, "completion_tokens": 5, "total_tokens": 14 }
    })
}

fn bedrock_response() -> serde_json::Value {
    serde_json::json!({
        "completion": COMPLETION_TEXT,
        "stop_reason": "stop_sequence",
        "stop": "\n\nHuman:",
        "amazon-bedrock-invocationMetrics": {
            "inputTokenCount": 12,
            "outputTokenCount": 5,
            "invocationLatency": 100,
            "firstByteLatency": 40
        }
    })
}

fn keyed_events(model: &str) -> Vec<String> {
    let mut events: Vec<_> = STREAMED_TEXT
        .iter()
        .map(|text| {
            serde_json::json!({
                "id": "chatcmpl-mock",
                "object": "chat.completion.chunk",
                "created": 1_700_000_000,
                "model": model,
                "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }]
            })
        })
        .collect();
    events.push(serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }],
        "usage": { "prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12 }
    }));

    let mut frames: Vec<_> = events.iter().map(|e| format!("data: {e}\n\n")).collect();
    frames.push("data: [DONE]\n\n".to_owned());
    frames
}

fn bedrock_events() -> Vec<String> {
    let mut events: Vec<_> = STREAMED_TEXT
        .iter()
        .map(|text| serde_json::json!({ "completion": text, "stop_reason": null }))
        .collect();
    events.push(serde_json::json!({
        "completion": "",
        "stop_reason": "stop_sequence",
        "amazon-bedrock-invocationMetrics": {
            "inputTokenCount": 12,
            "outputTokenCount": 3,
            "invocationLatency": 100,
            "firstByteLatency": 40
        }
    }));

    events.iter().map(|e| format!("data: {e}\n\n")).collect()
}

fn sse_response(mut frames: Vec<String>, behavior: &Behavior) -> Response {
    if behavior.truncate {
        frames.truncate(2);
        frames.push("data: {\"id\":\"chatcmpl-mock\",\"choi".to_owned());
    }

    let delay = behavior.chunk_delay;
    let body = futures_util::stream::iter(frames.into_iter().enumerate()).then(move |(i, frame)| async move {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok::<_, Infallible>(Bytes::from(frame))
    });

    Response::builder()
        .header(CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(body))
        .unwrap()
}
