// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use crate::upstream::UpstreamError;

/// What the producer hands to the writer, in upstream order.
///
/// `Finished` and `Failed` are terminal: the producer yields nothing after
/// either of them.
#[derive(Debug)]
pub enum ProducerEvent {
    /// A non-empty text delta.
    Delta(String),
    /// Upstream exhausted normally.
    Finished,
    /// Upstream failed; carries the cause for logging.
    Failed(UpstreamError),
}
