//! # Transcript Text Extraction
//!
//! Turns a raw transcription result payload into the plain text stored in
//! the search index. Recognized tokens are joined into sentences; a
//! sentence ends at a period token and opens with a bracketed timestamp
//! marker taken from its first spoken token, so search hits can be located
//! in the source media.

use crate::{CrawlError, Result};
use serde::Deserialize;

/// Root of the transcription result payload.
#[derive(Debug, Deserialize)]
pub struct TranscriptPayload {
    pub results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptResults {
    pub items: Vec<TranscriptToken>,
}

/// One recognized token.
#[derive(Debug, Deserialize)]
pub struct TranscriptToken {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub content: String,
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// A spoken word.
    Pronunciation,
    /// A punctuation mark inserted by the service.
    Punctuation,
}

/// Parse a raw result payload.
pub fn parse_payload(raw: &[u8]) -> Result<TranscriptPayload> {
    serde_json::from_slice(raw).map_err(|e| CrawlError::Transcript(e.to_string()))
}

/// Extract plain text from a payload, line-wrapped at `wrap_width` columns.
///
/// Tokens are joined with single spaces. A sentence is closed by a `.`
/// punctuation token; each sentence opens with a `[start_time]` marker from
/// its first spoken token. A trailing unterminated sentence is kept.
pub fn extract_text(payload: &TranscriptPayload, wrap_width: usize) -> String {
    let mut sentences: Vec<String> = Vec::new();
    let mut sentence = String::new();

    for token in &payload.results.items {
        match token.kind {
            TokenKind::Punctuation => {
                if !sentence.is_empty() {
                    sentence.push(' ');
                }
                sentence.push_str(&token.content);
                if token.content == "." {
                    sentences.push(std::mem::take(&mut sentence));
                }
            }
            TokenKind::Pronunciation => {
                if sentence.is_empty() {
                    if let Some(start) = &token.start_time {
                        sentence = format!("[{start}]");
                    }
                }
                if !sentence.is_empty() {
                    sentence.push(' ');
                }
                sentence.push_str(&token.content);
            }
        }
    }

    if !sentence.is_empty() {
        sentences.push(sentence);
    }

    textwrap::fill(&sentences.join(" "), wrap_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> TranscriptPayload {
        parse_payload(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_single_sentence() {
        let payload = payload(
            r#"{"results":{"items":[
                {"type":"pronunciation","content":"Hello","start_time":"0.0"},
                {"type":"punctuation","content":"."}
            ]}}"#,
        );

        assert_eq!(extract_text(&payload, 70), "[0.0] Hello .");
    }

    #[test]
    fn test_timestamp_marker_per_sentence() {
        let payload = payload(
            r#"{"results":{"items":[
                {"type":"pronunciation","content":"Hello","start_time":"0.0"},
                {"type":"pronunciation","content":"there","start_time":"0.4"},
                {"type":"punctuation","content":"."},
                {"type":"pronunciation","content":"Goodbye","start_time":"1.2"},
                {"type":"punctuation","content":"."}
            ]}}"#,
        );

        assert_eq!(
            extract_text(&payload, 200),
            "[0.0] Hello there . [1.2] Goodbye ."
        );
    }

    #[test]
    fn test_non_final_punctuation_does_not_close_sentence() {
        let payload = payload(
            r#"{"results":{"items":[
                {"type":"pronunciation","content":"Well","start_time":"0.0"},
                {"type":"punctuation","content":","},
                {"type":"pronunciation","content":"yes","start_time":"0.8"},
                {"type":"punctuation","content":"."}
            ]}}"#,
        );

        assert_eq!(extract_text(&payload, 200), "[0.0] Well , yes .");
    }

    #[test]
    fn test_trailing_unterminated_sentence_kept() {
        let payload = payload(
            r#"{"results":{"items":[
                {"type":"pronunciation","content":"Unfinished","start_time":"3.5"}
            ]}}"#,
        );

        assert_eq!(extract_text(&payload, 200), "[3.5] Unfinished");
    }

    #[test]
    fn test_empty_payload() {
        let payload = payload(r#"{"results":{"items":[]}}"#);
        assert_eq!(extract_text(&payload, 70), "");
    }

    #[test]
    fn test_line_wrapping() {
        let payload = payload(
            r#"{"results":{"items":[
                {"type":"pronunciation","content":"alpha","start_time":"0.0"},
                {"type":"pronunciation","content":"beta","start_time":"0.5"},
                {"type":"pronunciation","content":"gamma","start_time":"1.0"},
                {"type":"punctuation","content":"."}
            ]}}"#,
        );

        let text = extract_text(&payload, 12);
        assert!(text.contains('\n'));
        for line in text.lines() {
            assert!(line.len() <= 12, "line too long: {line:?}");
        }
        assert_eq!(text.replace('\n', " "), "[0.0] alpha beta gamma .");
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        assert!(parse_payload(b"not json").is_err());
        assert!(parse_payload(br#"{"results":{}}"#).is_err());
    }
}
