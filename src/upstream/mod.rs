// Upstream completion source
//
// Wraps the hosted completion API behind `CompletionSource` so the relay
// never touches a concrete HTTP client:
// - `stream`: ordered, lazy sequence of text deltas
// - `complete`: whole reply in one response
//
// The Azure OpenAI implementation sends through the injected `HttpSender`
// and parses the provider's own SSE stream with the same reassembly buffer
// the relay client uses.

mod chunk;

pub use chunk::{classify_upstream_line, UpstreamChunk};

use crate::config::{ChatConfig, Config, UpstreamConfig};
use crate::wire::ReassemblyBuffer;
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use futures_util::TryStreamExt;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

/// Largest upstream error body kept for diagnostics.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Ordered text deltas from the provider. Ends on exhaustion; an `Err`
/// item is always the last item.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// Source of completions for a single user prompt.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Start a streaming completion.
    async fn stream(&self, prompt: &str) -> Result<DeltaStream, UpstreamError>;

    /// Run a non-streaming completion and return the full reply.
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Sends HTTP requests to the provider.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout_ms: Option<u64>,
    pub stream: bool,
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

pub enum HttpBody {
    Full(Bytes),
    Stream(ByteStream),
}

impl HttpBody {
    fn into_stream(self) -> ByteStream {
        match self {
            HttpBody::Full(bytes) => Box::pin(futures_util::stream::once(async move { Ok(bytes) })),
            HttpBody::Stream(s) => s,
        }
    }

    /// Read the whole body, giving up after `limit` bytes.
    async fn collect(self, limit: usize) -> Result<Bytes, HttpError> {
        match self {
            HttpBody::Full(bytes) => Ok(bytes),
            HttpBody::Stream(mut s) => {
                let mut collected = Vec::new();
                while let Some(chunk) = s.next().await {
                    collected.extend_from_slice(&chunk?);
                    if collected.len() >= limit {
                        collected.truncate(limit);
                        break;
                    }
                }
                Ok(Bytes::from(collected))
            }
        }
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub body: HttpBody,
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream request timed out: {0}")]
    Timeout(String),
}

/// Every way the completion source can fail.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream timed out: {0}")]
    Timeout(String),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed upstream payload: {0}")]
    MalformedPayload(String),

    #[error("upstream provider error: {0}")]
    Provider(String),
}

impl From<HttpError> for UpstreamError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Transport(msg) => UpstreamError::Transport(msg),
            HttpError::Timeout(msg) => UpstreamError::Timeout(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Azure OpenAI completion source
// ---------------------------------------------------------------------------

pub struct AzureOpenAiSource {
    http: Arc<dyn HttpSender>,
    upstream: UpstreamConfig,
    chat: ChatConfig,
}

impl AzureOpenAiSource {
    pub fn new(http: Arc<dyn HttpSender>, upstream: UpstreamConfig, chat: ChatConfig) -> Self {
        Self {
            http,
            upstream,
            chat,
        }
    }

    fn build_request(&self, prompt: &str, stream: bool) -> HttpRequest {
        let body = serde_json::json!({
            "model": self.upstream.model,
            "messages": [
                { "role": "system", "content": self.chat.system_prompt },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": self.chat.max_tokens,
            "temperature": self.chat.temperature,
            "top_p": self.chat.top_p,
            "stream": stream,
        });

        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if stream {
            headers.insert("accept", HeaderValue::from_static("text/event-stream"));
        }
        match HeaderValue::from_str(&self.upstream.api_key) {
            Ok(mut key) => {
                key.set_sensitive(true);
                headers.insert("api-key", key);
            }
            Err(_) => tracing::warn!("api key contains characters not allowed in a header"),
        }

        HttpRequest {
            url: self.upstream.completions_url(),
            headers,
            body: Bytes::from(body.to_string()),
            timeout_ms: self.upstream.timeout_ms,
            stream,
        }
    }

    /// Send and turn non-success statuses into `UpstreamError::Status`.
    async fn send_checked(&self, request: HttpRequest) -> Result<HttpResponse, UpstreamError> {
        tracing::debug!(
            url = %request.url,
            stream = request.stream,
            "sending completion request"
        );
        let response = self.http.send(request).await?;
        if response.status.is_success() {
            return Ok(response);
        }

        let status = response.status.as_u16();
        let body = response
            .body
            .collect(MAX_ERROR_BODY_BYTES)
            .await
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        Err(UpstreamError::Status { status, body })
    }
}

#[async_trait]
impl CompletionSource for AzureOpenAiSource {
    async fn stream(&self, prompt: &str) -> Result<DeltaStream, UpstreamError> {
        let response = self.send_checked(self.build_request(prompt, true)).await?;
        Ok(parse_delta_stream(response.body.into_stream()))
    }

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let response = self.send_checked(self.build_request(prompt, false)).await?;
        let body = response.body.collect(usize::MAX).await?;

        let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
            UpstreamError::MalformedPayload(format!("response is not valid JSON: {e}"))
        })?;

        if let Some(err) = json.get("error") {
            return Err(UpstreamError::Provider(chunk::error_message(err)));
        }

        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                UpstreamError::MalformedPayload("missing choices[0].message.content".to_string())
            })
    }
}

// ---------------------------------------------------------------------------
// Upstream SSE -> delta stream
// ---------------------------------------------------------------------------

/// Mutable state carried through the upstream parsing loop.
struct DeltaParseState {
    body: ByteStream,
    lines: ReassemblyBuffer,
    /// Parsed items not yet handed out; an `Err` is always last.
    ready: VecDeque<Result<String, UpstreamError>>,
    finished: bool,
}

/// Parse a provider SSE byte stream into ordered text deltas.
///
/// Stops at `data: [DONE]`, at the first failure, or when the body ends.
pub fn parse_delta_stream(body: ByteStream) -> DeltaStream {
    let state = DeltaParseState {
        body,
        lines: ReassemblyBuffer::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for line in state.lines.push(&chunk) {
                        match classify_upstream_line(&line) {
                            UpstreamChunk::Delta(delta) => state.ready.push_back(Ok(delta)),
                            UpstreamChunk::Control => {}
                            UpstreamChunk::Done => {
                                state.finished = true;
                                break;
                            }
                            UpstreamChunk::Failed(e) => {
                                state.ready.push_back(Err(e));
                                state.finished = true;
                                break;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    state.ready.push_back(Err(e.into()));
                    state.finished = true;
                }
                None => {
                    let dropped = state.lines.discard();
                    if dropped > 0 {
                        tracing::debug!(bytes = dropped, "upstream ended mid-line; tail dropped");
                    }
                    state.finished = true;
                }
            }
        }
    }))
}

// ---------------------------------------------------------------------------
// Reqwest HTTP sender
// ---------------------------------------------------------------------------

pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut req = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .body(request.body);

        if let Some(timeout_ms) = request.timeout_ms {
            req = req.timeout(std::time::Duration::from_millis(timeout_ms));
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(e.to_string())
            } else {
                HttpError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();

        if request.stream {
            let stream = resp
                .bytes_stream()
                .map_err(|e| HttpError::Transport(e.to_string()));
            Ok(HttpResponse {
                status,
                body: HttpBody::Stream(Box::pin(stream)),
            })
        } else {
            let body = resp
                .bytes()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            Ok(HttpResponse {
                status,
                body: HttpBody::Full(body),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Public factory for the default completion source
// ---------------------------------------------------------------------------

pub fn build_completion_source(config: &Config) -> AzureOpenAiSource {
    AzureOpenAiSource::new(
        Arc::new(ReqwestHttpSender::new(reqwest::Client::new())),
        config.upstream.clone(),
        config.chat.clone(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn upstream_config() -> UpstreamConfig {
        UpstreamConfig {
            endpoint: "https://contoso.openai.azure.com".to_string(),
            api_key: "test-key".to_string(),
            api_version: "2024-10-21".to_string(),
            deployment: "gpt-4o".to_string(),
            model: "gpt-4o".to_string(),
            timeout_ms: Some(5000),
        }
    }

    /// Replays canned response chunks and records the request it was sent.
    struct CannedHttpSender {
        status: StatusCode,
        chunks: Vec<Result<Bytes, String>>,
        captured: Mutex<Option<HttpRequest>>,
    }

    impl CannedHttpSender {
        fn ok(chunks: Vec<&str>) -> Self {
            Self {
                status: StatusCode::OK,
                chunks: chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from(c.to_string())))
                    .collect(),
                captured: Mutex::new(None),
            }
        }

        fn with_status(status: StatusCode, body: &str) -> Self {
            Self {
                status,
                chunks: vec![Ok(Bytes::from(body.to_string()))],
                captured: Mutex::new(None),
            }
        }

        fn captured(&self) -> HttpRequest {
            self.captured.lock().unwrap().clone().expect("request should be sent")
        }
    }

    #[async_trait]
    impl HttpSender for CannedHttpSender {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let stream = request.stream;
            *self.captured.lock().unwrap() = Some(request);

            let items: Vec<Result<Bytes, HttpError>> = self
                .chunks
                .iter()
                .map(|c| c.clone().map_err(HttpError::Transport))
                .collect();

            let body = if stream {
                HttpBody::Stream(Box::pin(futures_util::stream::iter(items)))
            } else {
                let mut all = Vec::new();
                for item in items {
                    all.extend_from_slice(&item?);
                }
                HttpBody::Full(Bytes::from(all))
            };

            Ok(HttpResponse {
                status: self.status,
                body,
            })
        }
    }

    struct RefusingHttpSender;

    #[async_trait]
    impl HttpSender for RefusingHttpSender {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
            Err(HttpError::Transport("connection refused".to_string()))
        }
    }

    fn source(http: Arc<dyn HttpSender>) -> AzureOpenAiSource {
        AzureOpenAiSource::new(http, upstream_config(), ChatConfig::default())
    }

    fn delta_line(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices":[{"index":0,"delta":{"content":content}}]})
        )
    }

    async fn collect(stream: DeltaStream) -> Vec<Result<String, UpstreamError>> {
        stream.collect().await
    }

    // -----------------------------------------------------------------------
    // Request shape
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn stream_request_targets_deployment_with_api_key() {
        let http = Arc::new(CannedHttpSender::ok(vec!["data: [DONE]\n\n"]));
        let src = source(http.clone());

        let _ = collect(src.stream("hello").await.unwrap()).await;

        let req = http.captured();
        assert_eq!(
            req.url,
            "https://contoso.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21"
        );
        assert_eq!(req.headers.get("api-key").unwrap(), "test-key");
        assert_eq!(req.timeout_ms, Some(5000));
        assert!(req.stream);

        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are a helpful assistant.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    // -----------------------------------------------------------------------
    // Streaming
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn deltas_arrive_in_order_and_control_chunks_are_skipped() {
        let filter = r#"data: {"choices":[],"prompt_filter_results":[]}"#.to_string() + "\n\n";
        let role = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#.to_string() + "\n\n";
        let stop = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#.to_string() + "\n\n";
        let body = [
            filter,
            role,
            delta_line("Hel"),
            delta_line("lo"),
            stop,
            "data: [DONE]\n\n".to_string(),
        ]
        .concat();

        // Re-chunk at awkward offsets
        let bytes = body.as_bytes();
        let chunks: Vec<&str> = vec![
            std::str::from_utf8(&bytes[..7]).unwrap(),
            std::str::from_utf8(&bytes[7..130]).unwrap(),
            std::str::from_utf8(&bytes[130..]).unwrap(),
        ];

        let src = source(Arc::new(CannedHttpSender::ok(chunks)));
        let items = collect(src.stream("hi").await.unwrap()).await;
        let deltas: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(deltas, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn nothing_after_done_is_relayed() {
        let body = format!("{}data: [DONE]\n\n{}", delta_line("a"), delta_line("ghost"));
        let src = source(Arc::new(CannedHttpSender::ok(vec![body.as_str()])));
        let deltas: Vec<String> = collect(src.stream("hi").await.unwrap())
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(deltas, vec!["a"]);
    }

    #[tokio::test]
    async fn body_ending_without_done_is_natural_exhaustion() {
        let body = delta_line("only");
        let src = source(Arc::new(CannedHttpSender::ok(vec![body.as_str()])));
        let items = collect(src.stream("hi").await.unwrap()).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "only");
    }

    #[tokio::test]
    async fn malformed_chunk_ends_stream_with_error_after_prior_deltas() {
        let body = format!("{}data: {{oops\n\n{}", delta_line("Par"), delta_line("never"));
        let src = source(Arc::new(CannedHttpSender::ok(vec![body.as_str()])));
        let items = collect(src.stream("hi").await.unwrap()).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Par");
        assert!(matches!(items[1], Err(UpstreamError::MalformedPayload(_))));
    }

    #[tokio::test]
    async fn transport_error_mid_stream_is_last_item() {
        let http = CannedHttpSender {
            status: StatusCode::OK,
            chunks: vec![
                Ok(Bytes::from(delta_line("Par"))),
                Ok(Bytes::from(delta_line("tial"))),
                Err("connection reset".to_string()),
            ],
            captured: Mutex::new(None),
        };
        let src = source(Arc::new(http));
        let items = collect(src.stream("hi").await.unwrap()).await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), "Par");
        assert_eq!(items[1].as_ref().unwrap(), "tial");
        assert!(matches!(items[2], Err(UpstreamError::Transport(ref m)) if m.contains("reset")));
    }

    #[tokio::test]
    async fn non_success_status_fails_before_streaming() {
        let http = CannedHttpSender::with_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"rate limited"}}"#,
        );
        let src = source(Arc::new(http));
        match src.stream("hi").await {
            Err(UpstreamError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert!(body.contains("rate limited"));
            }
            Err(other) => panic!("expected status error, got {other}"),
            Ok(_) => panic!("expected status error, got a stream"),
        }
    }

    #[tokio::test]
    async fn connection_failure_maps_to_transport_error() {
        let src = source(Arc::new(RefusingHttpSender));
        assert!(matches!(src.stream("hi").await, Err(UpstreamError::Transport(_))));
        assert!(matches!(src.complete("hi").await, Err(UpstreamError::Transport(_))));
    }

    // -----------------------------------------------------------------------
    // Non-streaming
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn complete_returns_message_content() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Hi there"}}]}"#;
        let http = Arc::new(CannedHttpSender::ok(vec![body]));
        let src = source(http.clone());

        assert_eq!(src.complete("hello").await.unwrap(), "Hi there");

        let req = http.captured();
        assert!(!req.stream);
        let sent: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(sent["stream"], false);
    }

    #[tokio::test]
    async fn complete_surfaces_provider_error_object() {
        let body = r#"{"error":{"message":"deployment not found"}}"#;
        let src = source(Arc::new(CannedHttpSender::ok(vec![body])));
        assert!(matches!(
            src.complete("hello").await,
            Err(UpstreamError::Provider(ref m)) if m == "deployment not found"
        ));
    }

    #[tokio::test]
    async fn complete_rejects_unexpected_shape() {
        let src = source(Arc::new(CannedHttpSender::ok(vec![r#"{"choices":[]}"#])));
        assert!(matches!(
            src.complete("hello").await,
            Err(UpstreamError::MalformedPayload(_))
        ));
    }
}
