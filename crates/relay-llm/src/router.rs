//! OpenAI-compatible HTTP surface over a [`Registry`]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::{Stream, StreamExt, stream};
use relay_core::HttpError;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::provider::ChatStream;
use crate::registry::Registry;
use crate::types::ChatCompletionRequest;

/// Shared state for route handlers
#[derive(Clone)]
pub struct LlmState {
    registry: Arc<Registry>,
}

impl LlmState {
    pub const fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

#[derive(Debug, Serialize)]
struct ModelList {
    object: &'static str,
    data: Vec<ModelEntry>,
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    id: String,
    object: &'static str,
    created: u64,
    owned_by: String,
}

/// Build the router with all endpoints
pub fn llm_router(state: LlmState) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(chat_completions))
        .route("/v1/models", routing::get(list_models))
        .route("/health", routing::get(health))
        .with_state(state)
}

/// Handle `POST /v1/chat/completions`
async fn chat_completions(State(state): State<LlmState>, Json(request): Json<ChatCompletionRequest>) -> Response {
    let provider = match state.registry.resolve(&request.model) {
        Ok(provider) => provider,
        Err(e) => return error_response(&e),
    };

    if !request.stream {
        return match provider.create_chat_completion(&request).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => error_response(&e),
        };
    }

    let cancel = CancellationToken::new();
    match provider.create_chat_completion_stream(&request, cancel.clone()).await {
        Ok(chunks) => stream_response(chunks, cancel).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Handle `GET /v1/models`
async fn list_models(State(state): State<LlmState>) -> Response {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let data = state
        .registry
        .models()
        .into_iter()
        .filter_map(|id| {
            let owned_by = state.registry.resolve(&id).ok()?.name().to_owned();
            Some(ModelEntry {
                id,
                object: "model",
                created: now,
                owned_by,
            })
        })
        .collect();

    Json(ModelList { object: "list", data }).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// SSE response; dropping it (client disconnect) cancels the upstream call
fn stream_response(chunks: ChatStream, cancel: CancellationToken) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let guard = cancel.drop_guard();

    let events = chunks.map(|item| match item {
        Ok(chunk) => Event::default().json_data(chunk),
        Err(e) => {
            tracing::warn!(error = %e, "stream ended with error");
            Event::default().json_data(error_body(&e))
        }
    });

    let done = stream::once(async move {
        drop(guard);
        Ok(Event::default().data("[DONE]"))
    });

    Sse::new(events.chain(done)).keep_alive(KeepAlive::default())
}

fn error_body(error: &LlmError) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": error.client_message(),
            "type": error.error_type(),
            "code": serde_json::Value::Null,
        }
    })
}

/// Convert an error to an OpenAI-style JSON error response
fn error_response(error: &LlmError) -> Response {
    if error.status_code().is_server_error() {
        tracing::error!(error = %error, "completion failed");
    }
    (error.status_code(), Json(error_body(error))).into_response()
}
