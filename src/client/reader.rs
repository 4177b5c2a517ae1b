// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ClientError;
use crate::wire::ReassemblyBuffer;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>>;

/// Pull-based frame reader over a response body.
///
/// Each call to `next_frame` suspends at most once per network read. Frames
/// come back in arrival order, each exactly once; a partial line left when
/// the body ends is dropped, never reported.
pub struct FrameReader {
    body: BodyStream,
    buffer: ReassemblyBuffer,
    ready: VecDeque<String>,
    finished: bool,
}

impl FrameReader {
    pub fn new<S, E>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display,
    {
        Self {
            body: Box::pin(body.map(|chunk| chunk.map_err(|e| e.to_string()))),
            buffer: ReassemblyBuffer::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    /// Next complete frame line, or `None` once the body has ended.
    ///
    /// A transport error is returned once; afterwards the reader is
    /// exhausted.
    pub async fn next_frame(&mut self) -> Result<Option<String>, ClientError> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.finished {
                return Ok(None);
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.ready.extend(self.buffer.push(&chunk)),
                Some(Err(e)) => {
                    self.finished = true;
                    self.buffer.discard();
                    return Err(ClientError::Transport(e));
                }
                None => {
                    self.finished = true;
                    let dropped = self.buffer.discard();
                    if dropped > 0 {
                        tracing::debug!(bytes = dropped, "body ended mid-frame; tail discarded");
                    }
                }
            }
        }
    }
}
