//! # HTTP Response Helpers
//!
//! Strict JSON parsing of response bodies and user-facing hints for common
//! failure statuses.

use serde_json::Value;
use thiserror::Error;

/// Return a user-friendly error message for common HTTP status codes.
///
/// # Example
/// ```rust
/// use nac_util::http::status_error_message;
///
/// let unauthorized = status_error_message(401).unwrap();
/// assert!(unauthorized.contains("NAC_CONSOLE_TOKEN"));
///
/// let forbidden = status_error_message(403).unwrap();
/// assert!(forbidden.contains("admin role"));
///
/// assert!(status_error_message(500).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: the console session expired; set NAC_CONSOLE_TOKEN=...".into()),
        403 => Some("Forbidden (403). Hint: the admin role lacks read access to this resource".into()),
        404 => Some("Not Found (404). Hint: check the configured base paths".into()),
        _ => None,
    }
}

/// Parse HTTP response text into JSON, providing detailed errors on failure.
///
/// The error carries the originating status and a truncated, whitespace
/// collapsed preview of the body.
///
/// # Errors
/// Returns a [`JsonParseError`] when `text` is not valid JSON.
pub fn parse_response_json_strict(text: &str, status: Option<u16>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        JsonParseError::new(status_note, error, truncate_response_preview(text, 200))
    })
}

/// Structured error payload attached to a failed response, when the body is JSON.
pub fn parse_error_detail(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str::<Value>(text).ok()
}

fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// Error returned when strict JSON parsing of an HTTP response fails.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    /// Truncated response preview captured during parsing.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_parse_reports_status_and_preview() {
        let error = parse_response_json_strict("<html>\n<body>login</body>", Some(200)).expect_err("not json");
        let message = error.to_string();
        assert!(message.contains("status 200"), "message: {message}");
        assert_eq!(error.body_preview(), "<html> <body>login</body>");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let error = parse_response_json_strict(&body, None).expect_err("not json");
        assert!(error.body_preview().ends_with("..."));
        assert!(error.to_string().contains("unknown status"));
    }

    #[test]
    fn error_detail_is_parsed_only_from_json() {
        assert_eq!(parse_error_detail(r#"{"message":"bad"}"#), Some(json!({ "message": "bad" })));
        assert_eq!(parse_error_detail("Internal Server Error"), None);
        assert_eq!(parse_error_detail("  "), None);
    }
}
