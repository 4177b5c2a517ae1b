// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

// Receiving half of the relay
//
// Responsibilities:
// - Pull response body chunks one at a time and rebuild complete frames
//   across arbitrary chunk boundaries (reader)
// - Interpret frames against one stream session and grow the in-flight
//   assistant message in place (accumulator)
// - Drive a whole request, surfacing every failure as an error message in
//   the conversation and notifying the render layer after each change
//   (chat)

mod accumulator;
mod chat;
mod error;
mod reader;

pub use accumulator::{EventAccumulator, FrameOutcome, SessionState};
pub use chat::{
    ChatClient, ChatOutcome, NoopObserver, RenderObserver, StreamOutcome, REQUEST_FAILURE_TEXT,
    STREAM_FAILURE_TEXT,
};
pub use error::ClientError;
pub use reader::FrameReader;
