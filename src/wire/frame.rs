// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Prefix carried by every meaningful record line.
pub const DATA_PREFIX: &str = "data: ";
/// Payload of the terminal success record.
pub const DONE_MARKER: &str = "[DONE]";
/// Payload of the terminal failure record.
pub const ERROR_MARKER: &str = "[ERROR]";
/// Frames are separated by line feeds; a record ends with a blank line.
pub const LINE_DELIMITER: char = '\n';

/// One interpretable unit of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A non-empty text delta.
    Content(String),
    /// Stream finished successfully.
    Done,
    /// Stream failed upstream.
    Error,
}

impl Frame {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Done | Frame::Error)
    }
}

/// JSON body of a content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePayload {
    #[serde(default)]
    pub content: Option<String>,
}

/// Serialize a frame as one complete wire record.
pub fn encode_frame(frame: &Frame) -> Bytes {
    match frame {
        Frame::Content(delta) => {
            let json = serde_json::json!({ "content": delta }).to_string();
            Bytes::from(format!("{DATA_PREFIX}{json}\n\n"))
        }
        Frame::Done => Bytes::from(format!("{DATA_PREFIX}{DONE_MARKER}\n\n")),
        Frame::Error => Bytes::from(format!("{DATA_PREFIX}{ERROR_MARKER}\n\n")),
    }
}

/// Interpret one complete line from the receive side.
///
/// Returns `None` for anything that is not a usable frame: lines without
/// the `data: ` prefix (blank separators, comments, keepalives), payloads
/// that are not JSON, and JSON without a non-empty `content` field.
pub fn classify_line(line: &str) -> Option<Frame> {
    let payload = line.strip_prefix(DATA_PREFIX)?;

    if payload == DONE_MARKER {
        return Some(Frame::Done);
    }
    if payload == ERROR_MARKER {
        return Some(Frame::Error);
    }

    match serde_json::from_str::<FramePayload>(payload) {
        Ok(FramePayload {
            content: Some(content),
        }) if !content.is_empty() => Some(Frame::Content(content)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_frame_encodes_as_data_record() {
        let bytes = encode_frame(&Frame::Content("Hello".to_string()));
        assert_eq!(&bytes[..], b"data: {\"content\":\"Hello\"}\n\n");
    }

    #[test]
    fn content_is_json_escaped() {
        let bytes = encode_frame(&Frame::Content("line\nbreak \"quoted\"".to_string()));
        let text = std::str::from_utf8(&bytes).unwrap();
        // The only raw line feeds are the record terminator.
        assert_eq!(text.matches('\n').count(), 2);
        assert!(text.contains(r#"line\nbreak \"quoted\""#));
    }

    #[test]
    fn sentinels_encode_literally() {
        assert_eq!(&encode_frame(&Frame::Done)[..], b"data: [DONE]\n\n");
        assert_eq!(&encode_frame(&Frame::Error)[..], b"data: [ERROR]\n\n");
    }

    #[test]
    fn only_sentinels_are_terminal() {
        assert!(Frame::Done.is_terminal());
        assert!(Frame::Error.is_terminal());
        assert!(!Frame::Content("x".into()).is_terminal());
    }

    #[test]
    fn classify_recognizes_sentinels() {
        assert_eq!(classify_line("data: [DONE]"), Some(Frame::Done));
        assert_eq!(classify_line("data: [ERROR]"), Some(Frame::Error));
    }

    #[test]
    fn classify_extracts_content() {
        assert_eq!(
            classify_line(r#"data: {"content":"tok"}"#),
            Some(Frame::Content("tok".to_string()))
        );
    }

    #[test]
    fn classify_skips_unmarked_lines() {
        assert_eq!(classify_line(""), None);
        assert_eq!(classify_line(": keepalive"), None);
        assert_eq!(classify_line("event: ping"), None);
        assert_eq!(classify_line(r#"{"content":"no prefix"}"#), None);
    }

    #[test]
    fn classify_skips_malformed_and_empty_payloads() {
        assert_eq!(classify_line("data: {not json}"), None);
        assert_eq!(classify_line(r#"data: {"content":""}"#), None);
        assert_eq!(classify_line(r#"data: {"error":"Stream failed"}"#), None);
        assert_eq!(classify_line(r#"data: {"content":42}"#), None);
    }

    #[test]
    fn encoded_records_classify_back() {
        let text = String::from_utf8(encode_frame(&Frame::Content("über".into())).to_vec()).unwrap();
        let first_line = text.split('\n').next().unwrap();
        assert_eq!(classify_line(first_line), Some(Frame::Content("über".into())));
    }
}
