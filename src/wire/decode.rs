// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

/// Incremental UTF-8 decoder for byte chunks arriving off the network.
///
/// A multi-byte sequence cut by a chunk boundary is held back until the
/// next chunk completes it. Bytes that can never form valid UTF-8 decode to
/// U+FFFD, so decoding itself never fails.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Leading bytes of an incomplete sequence from the previous chunk.
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, carrying an incomplete trailing sequence forward.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let input = if self.pending.is_empty() {
            chunk.to_vec()
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            joined
        };

        let mut out = String::with_capacity(input.len());
        let mut pieces = input.utf8_chunks().peekable();
        while let Some(piece) = pieces.next() {
            out.push_str(piece.valid());

            let invalid = piece.invalid();
            if invalid.is_empty() {
                continue;
            }
            if pieces.peek().is_none() && is_truncated(invalid) {
                // Cut off by the chunk boundary: wait for more bytes.
                self.pending = invalid.to_vec();
            } else {
                out.push(char::REPLACEMENT_CHARACTER);
            }
        }
        out
    }

    /// Number of bytes held back waiting for the rest of a sequence.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flush at end of input. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// A prefix of some valid sequence, as opposed to bytes no continuation
/// could repair.
fn is_truncated(bytes: &[u8]) -> bool {
    matches!(std::str::from_utf8(bytes), Err(e) if e.error_len().is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_straight_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"hello"), "hello");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        // "é" is 0xC3 0xA9
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"caf\xC3"), "caf");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(b"\xA9!"), "é!");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn four_byte_char_fed_one_byte_at_a_time() {
        let emoji = "🦀".as_bytes();
        assert_eq!(emoji.len(), 4);

        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for b in emoji {
            out.push_str(&decoder.decode(std::slice::from_ref(b)));
        }
        assert_eq!(out, "🦀");
    }

    #[test]
    fn invalid_bytes_become_replacement_chars() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn truncated_sequence_before_more_text_is_replaced_not_held() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"\xE2\x82x"), "\u{FFFD}x");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn invalid_byte_then_split_char_keeps_only_the_split_tail() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xFF\xE2\x82"), "a\u{FFFD}");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.decode(b"\xACb"), "\u{20AC}b");
    }

    #[test]
    fn finish_flushes_dangling_prefix() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"x\xE2\x82"), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }
}
