// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

// Upstream chunk classification
//
// The provider streams OpenAI-format SSE:
//   data: {"choices":[{"index":0,"delta":{"content":"Hel"}}]}
//   data: [DONE]
// Azure additionally sends a leading chunk with empty `choices` carrying
// prompt filter results.

use super::UpstreamError;

/// What one complete upstream SSE line means for the delta sequence.
#[derive(Debug)]
pub enum UpstreamChunk {
    /// A text delta (possibly empty; emptiness is filtered downstream).
    Delta(String),
    /// Role announcements, filter results, finish reasons, comments,
    /// separators: nothing to relay.
    Control,
    /// `data: [DONE]`.
    Done,
    /// The provider reported an error or sent something unparseable.
    Failed(UpstreamError),
}

/// Classify one line of the upstream event stream.
pub fn classify_upstream_line(line: &str) -> UpstreamChunk {
    let trimmed = line.trim();

    // Blank separators and `:` comments
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return UpstreamChunk::Control;
    }

    let data = match trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))
    {
        Some(d) => d.trim(),
        // event:, id:, retry: lines carry nothing we relay
        None => return UpstreamChunk::Control,
    };

    if data == "[DONE]" {
        return UpstreamChunk::Done;
    }

    let json: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return UpstreamChunk::Failed(UpstreamError::MalformedPayload(format!(
                "stream chunk is not valid JSON: {e}"
            )))
        }
    };

    if let Some(err) = json.get("error") {
        return UpstreamChunk::Failed(UpstreamError::Provider(error_message(err)));
    }

    // Navigate to choices[0]
    let choice = match json.get("choices").and_then(|c| c.get(0)) {
        Some(c) => c,
        None => return UpstreamChunk::Control,
    };

    match choice
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
    {
        Some(content) => UpstreamChunk::Delta(content.to_string()),
        None => UpstreamChunk::Control,
    }
}

/// Best-effort human-readable text from a provider `error` value.
pub(crate) fn error_message(err: &serde_json::Value) -> String {
    err.get("message")
        .and_then(|m| m.as_str())
        .map(str::to_owned)
        .or_else(|| err.as_str().map(str::to_owned))
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_delta_is_extracted() {
        let line = r#"data: {"id":"c1","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert!(matches!(classify_upstream_line(line), UpstreamChunk::Delta(ref d) if d == "Hello"));
    }

    #[test]
    fn data_without_space_is_accepted() {
        let line = r#"data:{"choices":[{"delta":{"content":"x"}}]}"#;
        assert!(matches!(classify_upstream_line(line), UpstreamChunk::Delta(ref d) if d == "x"));
    }

    #[test]
    fn role_only_delta_is_control() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert!(matches!(classify_upstream_line(line), UpstreamChunk::Control));
    }

    #[test]
    fn prompt_filter_chunk_with_empty_choices_is_control() {
        let line = r#"data: {"choices":[],"prompt_filter_results":[{"prompt_index":0}]}"#;
        assert!(matches!(classify_upstream_line(line), UpstreamChunk::Control));
    }

    #[test]
    fn finish_reason_chunk_is_control() {
        let line = r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert!(matches!(classify_upstream_line(line), UpstreamChunk::Control));
    }

    #[test]
    fn done_marker_is_recognized() {
        assert!(matches!(classify_upstream_line("data: [DONE]"), UpstreamChunk::Done));
    }

    #[test]
    fn separators_and_comments_are_control() {
        assert!(matches!(classify_upstream_line(""), UpstreamChunk::Control));
        assert!(matches!(classify_upstream_line(": ping"), UpstreamChunk::Control));
        assert!(matches!(classify_upstream_line("event: message"), UpstreamChunk::Control));
    }

    #[test]
    fn unparseable_data_fails() {
        assert!(matches!(
            classify_upstream_line("data: {truncated"),
            UpstreamChunk::Failed(UpstreamError::MalformedPayload(_))
        ));
    }

    #[test]
    fn provider_error_payload_fails_with_message() {
        let line = r#"data: {"error":{"message":"content filtered","code":"content_filter"}}"#;
        match classify_upstream_line(line) {
            UpstreamChunk::Failed(UpstreamError::Provider(msg)) => assert_eq!(msg, "content filtered"),
            other => panic!("expected provider failure, got {other:?}"),
        }
    }
}
