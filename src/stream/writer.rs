// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::types::ProducerEvent;
use crate::wire::{encode_frame, Frame};
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::pin::Pin;

/// Transport headers for a persistent, unbuffered event channel.
pub fn sse_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    // nginx and friends buffer proxied responses unless told otherwise
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    headers
}

/// Build the streaming HTTP response for one request.
pub fn sse_response(
    events: impl Stream<Item = ProducerEvent> + Send + 'static,
    request_id: String,
) -> Response {
    let body = frame_stream(events, request_id).map(Ok::<Bytes, Infallible>);
    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::OK;
    *response.headers_mut() = sse_headers();
    response
}

/// Encode producer events as wire records, one chunk per frame.
///
/// Guarantees exactly one terminal sentinel at the end and nothing after
/// it. A producer that stops without a terminal event is reported to the
/// client as `[ERROR]`.
pub fn frame_stream(
    events: impl Stream<Item = ProducerEvent> + Send + 'static,
    request_id: String,
) -> impl Stream<Item = Bytes> + Send + 'static {
    let state = WriterState {
        events: Box::pin(events),
        sentinel_sent: false,
        session: SessionLog {
            request_id,
            frames: 0,
            terminated: false,
        },
    };

    futures_util::stream::unfold(state, |mut state| async move {
        // The sentinel counts as delivered only once the body asks for more.
        if state.sentinel_sent {
            state.session.terminated = true;
            return None;
        }

        let frame = match state.events.next().await {
            Some(ProducerEvent::Delta(delta)) => {
                state.session.frames += 1;
                Frame::Content(delta)
            }
            Some(ProducerEvent::Finished) => Frame::Done,
            Some(ProducerEvent::Failed(_)) => Frame::Error,
            None => {
                tracing::warn!(
                    request_id = %state.session.request_id,
                    frames = state.session.frames,
                    "producer ended without a terminal event; sending error sentinel"
                );
                Frame::Error
            }
        };
        state.sentinel_sent = frame.is_terminal();

        Some((encode_frame(&frame), state))
    })
}

struct WriterState {
    events: Pin<Box<dyn Stream<Item = ProducerEvent> + Send>>,
    sentinel_sent: bool,
    session: SessionLog,
}

/// Notes when the body is dropped before its terminal sentinel was
/// consumed, which means the client hung up mid-stream.
struct SessionLog {
    request_id: String,
    frames: usize,
    terminated: bool,
}

impl SessionLog {
    fn disconnected(&self) -> bool {
        !self.terminated
    }
}

impl Drop for SessionLog {
    fn drop(&mut self) {
        if self.disconnected() {
            tracing::info!(
                request_id = %self.request_id,
                frames = self.frames,
                "client disconnected before end of stream"
            );
        }
    }
}
