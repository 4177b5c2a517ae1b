// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::decode::Utf8StreamDecoder;
use super::frame::LINE_DELIMITER;
use memchr::memrchr;

/// Turns arbitrarily fragmented byte chunks into complete lines.
///
/// After every `push` the buffer holds at most one partial, undelimited
/// line. Each complete line is returned exactly once, in arrival order.
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    decoder: Utf8StreamDecoder,
    buffer: String,
}

impl ReassemblyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the lines it completed (delimiter removed,
    /// trailing `\r` stripped).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        // The held-back tail never contains a delimiter, so only the new
        // text needs scanning.
        let scanned = self.buffer.len();
        self.buffer.push_str(&text);

        let new_text = &self.buffer.as_bytes()[scanned..];
        let Some(offset) = memrchr(LINE_DELIMITER as u8, new_text) else {
            return Vec::new();
        };
        let last_delim = scanned + offset;

        let tail = self.buffer.split_off(last_delim + LINE_DELIMITER.len_utf8());
        let complete = std::mem::replace(&mut self.buffer, tail);

        complete
            .strip_suffix(LINE_DELIMITER)
            .unwrap_or(complete.as_str())
            .split(LINE_DELIMITER)
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect()
    }

    /// The partial line currently held back.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// End of input: drop whatever partial line remains.
    ///
    /// Returns the number of bytes discarded (including undecoded bytes of a
    /// truncated character).
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffer.len() + self.decoder.pending_len();
        self.buffer.clear();
        self.decoder.finish();
        dropped
    }
}
