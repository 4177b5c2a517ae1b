// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

// HTTP surface of the relay
//
// Responsibilities:
// - POST /chat-stream: validate the prompt, relay the completion as an
//   event stream
// - POST /chat: relay the whole completion as one JSON reply
// - GET /health: liveness check
// - Map request and upstream failures to JSON error bodies

use crate::stream::{sse_response, StreamProducer};
use crate::upstream::{CompletionSource, UpstreamError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Port the relay listens on when none is configured.
pub const DEFAULT_PORT: u16 = 3000;

// ---------------------------------------------------------------------------
// Request and error types
// ---------------------------------------------------------------------------

/// Body accepted by both chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("request body is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("message is missing or empty")]
    MissingMessage,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RelayError::MalformedJson(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "request body is not valid JSON" }),
            ),
            RelayError::MissingMessage => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "Message required" }),
            ),
            RelayError::Upstream(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": "Something went wrong",
                    "details": public_details(e),
                }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Upstream error text safe to hand to the browser. Provider error bodies
/// are logged, not echoed.
fn public_details(e: &UpstreamError) -> String {
    match e {
        UpstreamError::Status { status, .. } => format!("upstream returned status {status}"),
        other => other.to_string(),
    }
}

/// Extract the prompt from a chat request body.
///
/// The prompt is trimmed. An empty body, an absent field and a
/// whitespace-only message all count as missing.
pub fn parse_chat_request(body: &[u8]) -> Result<String, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RelayError::MissingMessage);
    }
    let request: ChatRequest =
        serde_json::from_slice(body).map_err(|e| RelayError::MalformedJson(e.to_string()))?;

    match request.message.as_deref().map(str::trim) {
        Some(message) if !message.is_empty() => Ok(message.to_string()),
        _ => Err(RelayError::MissingMessage),
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state injected into axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn CompletionSource>,
    pub producer: StreamProducer,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /health -> {"status":"ok","timestamp":...}
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// POST /chat -> {"reply": ...}
pub async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, RelayError> {
    let prompt = parse_chat_request(&body)?;
    let started = Instant::now();

    let reply = state.source.complete(&prompt).await.map_err(|e| {
        tracing::warn!(error = %e, "completion request failed");
        RelayError::from(e)
    })?;

    tracing::info!(
        reply_chars = reply.chars().count(),
        latency_ms = started.elapsed().as_secs_f64() * 1000.0,
        "completion relayed"
    );
    Ok(Json(serde_json::json!({ "reply": reply })))
}

/// POST /chat-stream -> text/event-stream
///
/// Validation failures are plain JSON errors. Once the stream starts every
/// failure is reported in-band as the error sentinel.
pub async fn chat_stream_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, RelayError> {
    let prompt = parse_chat_request(&body)?;
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        request_id = %request_id,
        prompt_chars = prompt.chars().count(),
        "stream session started"
    );

    let events = state.producer.produce(prompt, request_id.clone());
    Ok(sse_response(events, request_id))
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the relay router. The completion source is injected so handlers
/// never construct an HTTP client themselves.
pub fn build_router(source: Arc<dyn CompletionSource>) -> Router {
    let state = AppState {
        producer: StreamProducer::new(source.clone()),
        source,
    };

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat_handler))
        .route("/chat-stream", post(chat_stream_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
