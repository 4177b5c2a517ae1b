// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use crate::message::ConversationError;

/// Errors returned by the chat client.
///
/// Transport failures during a request are normally absorbed into the
/// conversation as an error message; only the reader reports them as
/// `Transport` directly.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("a stream session is already active for this conversation")]
    SessionActive,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}
