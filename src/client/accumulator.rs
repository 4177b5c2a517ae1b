// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use crate::message::{Conversation, ConversationError, MessageHandle};
use crate::wire::{classify_line, Frame, DATA_PREFIX};

/// Lifecycle of one stream session: `Idle -> Streaming -> {Done | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Done,
    Failed,
}

/// What applying a single frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Content was appended to the target message.
    Appended,
    /// A `data: ` record that carried no usable content.
    Skipped,
    /// Not a data record, or the session is not streaming.
    Ignored,
    /// `[DONE]` moved the session to `Done`.
    Finished,
    /// `[ERROR]` moved the session to `Failed`.
    Failed,
}

/// Interprets frames for one stream session.
///
/// The conversation is passed in on every call rather than held, so the
/// render layer can observe it between frames.
#[derive(Debug)]
pub struct EventAccumulator {
    state: SessionState,
    target: Option<MessageHandle>,
    appended: usize,
}

impl Default for EventAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventAccumulator {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            target: None,
            appended: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target(&self) -> Option<MessageHandle> {
        self.target
    }

    /// Number of content frames appended so far.
    pub fn appended(&self) -> usize {
        self.appended
    }

    /// Open the session: appends the empty assistant placeholder.
    pub fn begin(&mut self, conversation: &mut Conversation) -> Result<MessageHandle, ConversationError> {
        if self.state != SessionState::Idle {
            return Err(ConversationError::SessionActive);
        }
        let handle = conversation.begin_stream()?;
        self.target = Some(handle);
        self.state = SessionState::Streaming;
        Ok(handle)
    }

    /// Apply one complete frame line.
    ///
    /// Once the session is terminal every further line is `Ignored`. A
    /// stale target fails the session.
    pub fn apply(
        &mut self,
        conversation: &mut Conversation,
        line: &str,
    ) -> Result<FrameOutcome, ConversationError> {
        let Some(handle) = self.target.filter(|_| self.state == SessionState::Streaming) else {
            return Ok(FrameOutcome::Ignored);
        };
        if !line.starts_with(DATA_PREFIX) {
            return Ok(FrameOutcome::Ignored);
        }

        match classify_line(line) {
            Some(Frame::Content(delta)) => {
                if let Err(e) = conversation.append(handle, &delta) {
                    self.terminate(conversation, SessionState::Failed);
                    return Err(e);
                }
                self.appended += 1;
                Ok(FrameOutcome::Appended)
            }
            Some(Frame::Done) => {
                self.terminate(conversation, SessionState::Done);
                Ok(FrameOutcome::Finished)
            }
            Some(Frame::Error) => {
                self.terminate(conversation, SessionState::Failed);
                Ok(FrameOutcome::Failed)
            }
            None => {
                tracing::debug!(line_len = line.len(), "skipping unusable data frame");
                Ok(FrameOutcome::Skipped)
            }
        }
    }

    /// Fail the session from outside the frame stream (transport error or
    /// premature end). Returns false if the session was not streaming.
    pub fn fail(&mut self, conversation: &mut Conversation) -> bool {
        if self.state != SessionState::Streaming {
            return false;
        }
        self.terminate(conversation, SessionState::Failed);
        true
    }

    fn terminate(&mut self, conversation: &mut Conversation, state: SessionState) {
        self.state = state;
        if let Some(handle) = self.target {
            conversation.end_stream(handle);
        }
    }
}
