// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::accumulator::{EventAccumulator, FrameOutcome};
use super::error::ClientError;
use super::reader::FrameReader;
use crate::message::{Conversation, Message, MessageHandle, MessageKind};
use serde::Deserialize;
use std::time::Instant;

/// Shown when a streaming request fails for any reason.
pub const STREAM_FAILURE_TEXT: &str = "Sorry, the streaming request failed. Please try again later.";
/// Shown when a non-streaming request fails for any reason.
pub const REQUEST_FAILURE_TEXT: &str = "Sorry, the request failed. Please try again later.";

// ---------------------------------------------------------------------------
// Render boundary
// ---------------------------------------------------------------------------

/// Notified after every change to the conversation.
pub trait RenderObserver {
    fn on_update(&mut self, _conversation: &Conversation) {}
}

/// Observer that ignores every update.
pub struct NoopObserver;

impl RenderObserver for NoopObserver {}

impl<F> RenderObserver for F
where
    F: FnMut(&Conversation),
{
    fn on_update(&mut self, conversation: &Conversation) {
        self(conversation)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a streaming request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// `[DONE]` received.
    Completed,
    /// `[ERROR]` received; partial content kept.
    UpstreamFailed,
    /// Connect error, non-success status, or a read error mid-stream.
    TransportFailed,
    /// The body ended before any terminal sentinel.
    PrematureEnd,
}

/// How a non-streaming request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    Replied,
    Failed,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for a relay server.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submit `prompt` and stream the reply into `conversation`.
    ///
    /// Rejects an empty prompt or a conversation with an active session
    /// without touching it. Every other failure ends up in the conversation
    /// as an error message and is reported through the outcome.
    pub async fn stream_chat(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
        observer: &mut dyn RenderObserver,
    ) -> Result<StreamOutcome, ClientError> {
        let prompt = accept_prompt(conversation, prompt)?;
        conversation.push(Message::new(MessageKind::User, prompt));
        observer.on_update(conversation);

        let started = Instant::now();
        let response = match self
            .http
            .post(self.url("/chat-stream"))
            .json(&serde_json::json!({ "message": prompt }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "stream request failed");
                push_error(conversation, observer, STREAM_FAILURE_TEXT);
                return Ok(StreamOutcome::TransportFailed);
            }
        };

        let mut accumulator = EventAccumulator::new();
        let handle = accumulator
            .begin(conversation)
            .map_err(|_| ClientError::SessionActive)?;
        let mut session = ActiveSession {
            conversation,
            handle,
        };
        observer.on_update(session.conversation);

        let mut reader = FrameReader::new(response.bytes_stream());
        let outcome = loop {
            let line = match reader.next_frame().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    accumulator.fail(session.conversation);
                    break StreamOutcome::PrematureEnd;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stream read failed");
                    accumulator.fail(session.conversation);
                    break StreamOutcome::TransportFailed;
                }
            };

            match accumulator.apply(session.conversation, &line)? {
                FrameOutcome::Appended => observer.on_update(session.conversation),
                FrameOutcome::Finished => break StreamOutcome::Completed,
                FrameOutcome::Failed => break StreamOutcome::UpstreamFailed,
                FrameOutcome::Skipped | FrameOutcome::Ignored => {}
            }
        };

        tracing::debug!(
            outcome = ?outcome,
            deltas = accumulator.appended(),
            latency_ms = started.elapsed().as_secs_f64() * 1000.0,
            "stream session ended"
        );

        if outcome == StreamOutcome::Completed {
            observer.on_update(session.conversation);
        } else {
            push_error(session.conversation, observer, STREAM_FAILURE_TEXT);
        }
        Ok(outcome)
    }

    /// Submit `prompt` and append the whole reply as one assistant message.
    pub async fn chat(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
        observer: &mut dyn RenderObserver,
    ) -> Result<ChatOutcome, ClientError> {
        let prompt = accept_prompt(conversation, prompt)?;
        conversation.push(Message::new(MessageKind::User, prompt));
        observer.on_update(conversation);

        match self.request_reply(prompt).await {
            Ok(reply) => {
                conversation.push(Message::new(MessageKind::Assistant, reply));
                observer.on_update(conversation);
                Ok(ChatOutcome::Replied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                push_error(conversation, observer, REQUEST_FAILURE_TEXT);
                Ok(ChatOutcome::Failed)
            }
        }
    }

    async fn request_reply(&self, prompt: &str) -> Result<String, reqwest::Error> {
        let reply: ChatReply = self
            .http
            .post(self.url("/chat"))
            .json(&serde_json::json!({ "message": prompt }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(reply.reply)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Releases the session if the request future is dropped mid-stream.
struct ActiveSession<'a> {
    conversation: &'a mut Conversation,
    handle: MessageHandle,
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.conversation.end_stream(self.handle);
    }
}

fn accept_prompt<'p>(conversation: &Conversation, prompt: &'p str) -> Result<&'p str, ClientError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ClientError::EmptyPrompt);
    }
    if conversation.is_streaming() {
        return Err(ClientError::SessionActive);
    }
    Ok(prompt)
}

fn push_error(conversation: &mut Conversation, observer: &mut dyn RenderObserver, text: &str) {
    conversation.push(Message::new(MessageKind::Error, text));
    observer.on_update(conversation);
}
