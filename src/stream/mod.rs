// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

// Server half of the streaming relay
//
// Responsibilities:
// - Pull deltas from the completion source in order (producer)
// - Drop empty deltas, never reorder or coalesce
// - Frame each delta as one event-stream record, one body chunk per frame
//   (writer)
// - Always finish with exactly one terminal sentinel: [DONE] on exhaustion,
//   [ERROR] on upstream failure or a producer that ends without saying why

mod producer;
mod types;
mod writer;

pub use producer::StreamProducer;
pub use types::ProducerEvent;
pub use writer::{frame_stream, sse_headers, sse_response};
