// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::types::ProducerEvent;
use crate::upstream::{CompletionSource, DeltaStream};
use futures_util::stream::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Drives the completion source for one request.
///
/// The returned stream is pull-based: upstream is only read when the
/// response body asks for the next frame, so a client that goes away stops
/// upstream consumption as soon as the body is dropped.
#[derive(Clone)]
pub struct StreamProducer {
    source: Arc<dyn CompletionSource>,
}

impl StreamProducer {
    pub fn new(source: Arc<dyn CompletionSource>) -> Self {
        Self { source }
    }

    /// Start producing events for `prompt`.
    pub fn produce(
        &self,
        prompt: String,
        request_id: String,
    ) -> impl Stream<Item = ProducerEvent> + Send + 'static {
        let state = ProducerState::Connecting {
            source: self.source.clone(),
            prompt,
        };
        let ctx = ProducerContext {
            request_id,
            started: Instant::now(),
        };

        futures_util::stream::unfold((state, ctx), |(state, ctx)| async move {
            let (event, next) = step(state, &ctx).await?;
            Some((event, (next, ctx)))
        })
    }
}

struct ProducerContext {
    request_id: String,
    started: Instant,
}

impl ProducerContext {
    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

enum ProducerState {
    Connecting {
        source: Arc<dyn CompletionSource>,
        prompt: String,
    },
    Streaming {
        deltas: DeltaStream,
        emitted: usize,
    },
    Terminated,
}

/// Advance the producer to its next event.
async fn step(
    mut state: ProducerState,
    ctx: &ProducerContext,
) -> Option<(ProducerEvent, ProducerState)> {
    loop {
        state = match state {
            ProducerState::Connecting { source, prompt } => match source.stream(&prompt).await {
                Ok(deltas) => ProducerState::Streaming { deltas, emitted: 0 },
                Err(e) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        error = %e,
                        latency_ms = ctx.elapsed_ms(),
                        "upstream request failed"
                    );
                    return Some((ProducerEvent::Failed(e), ProducerState::Terminated));
                }
            },
            ProducerState::Streaming {
                mut deltas,
                emitted,
            } => match deltas.next().await {
                Some(Ok(delta)) if delta.is_empty() => ProducerState::Streaming { deltas, emitted },
                Some(Ok(delta)) => {
                    return Some((
                        ProducerEvent::Delta(delta),
                        ProducerState::Streaming {
                            deltas,
                            emitted: emitted + 1,
                        },
                    ));
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        error = %e,
                        deltas = emitted,
                        latency_ms = ctx.elapsed_ms(),
                        "upstream stream failed"
                    );
                    return Some((ProducerEvent::Failed(e), ProducerState::Terminated));
                }
                None => {
                    tracing::info!(
                        request_id = %ctx.request_id,
                        deltas = emitted,
                        latency_ms = ctx.elapsed_ms(),
                        "upstream stream finished"
                    );
                    return Some((ProducerEvent::Finished, ProducerState::Terminated));
                }
            },
            ProducerState::Terminated => return None,
        };
    }
}

