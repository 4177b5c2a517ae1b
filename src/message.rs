// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

// Conversation model shared by the chat client and the render layer.
//
// A conversation is an append-only sequence of messages. The one exception
// is the in-flight assistant message of an active stream session, which is
// grown in place through a `MessageHandle`.

use serde::{Deserialize, Serialize};

/// Who (or what) produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
    /// Locally synthesized failure notice, never sent upstream.
    Error,
}

/// A single entry in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub content: String,
}

impl Message {
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// Stable reference to the message a stream session appends to.
///
/// Carries the conversation epoch it was issued in; once the conversation
/// is cleared the handle no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHandle {
    epoch: u64,
    index: usize,
}

impl MessageHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("a stream session is already active for this conversation")]
    SessionActive,

    #[error("message handle is stale: the conversation changed shape during the session")]
    StaleHandle,
}

/// Ordered message sequence with at most one active stream session.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Bumped whenever existing indices stop meaning what they meant.
    epoch: u64,
    active: Option<MessageHandle>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a stream session currently owns an append target.
    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Start a stream session: appends the empty assistant placeholder and
    /// returns its handle. Fails if a session is already active.
    pub fn begin_stream(&mut self) -> Result<MessageHandle, ConversationError> {
        if self.active.is_some() {
            return Err(ConversationError::SessionActive);
        }
        let handle = MessageHandle {
            epoch: self.epoch,
            index: self.messages.len(),
        };
        self.messages.push(Message::new(MessageKind::Assistant, ""));
        self.active = Some(handle);
        Ok(handle)
    }

    /// Append a delta to the message behind `handle`, in place.
    pub fn append(&mut self, handle: MessageHandle, delta: &str) -> Result<(), ConversationError> {
        let message = self.resolve_mut(handle)?;
        message.content.push_str(delta);
        Ok(())
    }

    /// Look up the message behind a handle.
    pub fn get(&self, handle: MessageHandle) -> Result<&Message, ConversationError> {
        if handle.epoch != self.epoch {
            return Err(ConversationError::StaleHandle);
        }
        self.messages
            .get(handle.index)
            .ok_or(ConversationError::StaleHandle)
    }

    /// Release the active session if `handle` owns it. Idempotent.
    pub fn end_stream(&mut self, handle: MessageHandle) {
        if self.active == Some(handle) {
            self.active = None;
        }
    }

    /// Discard every message. Outstanding handles become stale and any
    /// active session is released.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.epoch += 1;
        self.active = None;
    }

    fn resolve_mut(&mut self, handle: MessageHandle) -> Result<&mut Message, ConversationError> {
        if handle.epoch != self.epoch {
            return Err(ConversationError::StaleHandle);
        }
        self.messages
            .get_mut(handle.index)
            .ok_or(ConversationError::StaleHandle)
    }
}
