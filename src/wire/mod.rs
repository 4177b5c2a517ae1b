// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

// Wire protocol between relay server and chat client
//
// Line-delimited text-event records:
//   data: {"content":"<delta>"}\n\n   content frame
//   data: [DONE]\n\n                  terminal success
//   data: [ERROR]\n\n                 terminal failure
//
// Encoding lives in `frame`; the receive side is split into a stateful
// UTF-8 decoder and a line reassembly buffer so that frames survive
// arbitrary chunk boundaries.

mod decode;
mod frame;
mod reassembly;

pub use decode::Utf8StreamDecoder;
pub use frame::{
    classify_line, encode_frame, Frame, FramePayload, DATA_PREFIX, DONE_MARKER, ERROR_MARKER,
    LINE_DELIMITER,
};
pub use reassembly::ReassemblyBuffer;
