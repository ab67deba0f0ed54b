//! # Text Processing Utilities
//!
//! Redaction of credentials before request or response text reaches logs.

use once_cell::sync::Lazy;
use regex::Regex;

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization:\s*)([^\r\n]+)",
        r"(?i)(x-csrf-token:\s*)([^\r\n]+)",
        r"(?i)(cookie:\s*)([^\r\n]+)",
        r"(?i)(bearer\s+)([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(?:TOKEN|SECRET|PASSWORD|SHARED_KEY)=)([^\s&]+)",
        r#"(?i)("(?:password|sharedSecret|radiusSharedSecret|token)"\s*:\s*)("[^"]*")"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("redaction pattern compiles"))
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// Key names are preserved so the redacted text is still useful for debugging.
///
/// # Example
/// ```rust
/// use nac_util::redact_sensitive;
///
/// assert_eq!(redact_sensitive("NAC_CONSOLE_TOKEN=abc123"), "NAC_CONSOLE_TOKEN=[REDACTED]");
/// assert_eq!(redact_sensitive("Authorization: Bearer abc"), "Authorization: [REDACTED]");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &regex::Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}[REDACTED]")
            })
            .into_owned();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::redact_sensitive;

    #[test]
    fn redacts_shared_secret_in_json_body() {
        let redacted = redact_sensitive(r#"{"name":"core-switch","radiusSharedSecret":"s3cr3t"}"#);
        assert_eq!(redacted, r#"{"name":"core-switch","radiusSharedSecret":[REDACTED]}"#);
    }

    #[test]
    fn redacts_csrf_header_line() {
        assert_eq!(redact_sensitive("X-CSRF-Token: 1234"), "X-CSRF-Token: [REDACTED]");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(redact_sensitive("GET /api/generate/groups"), "GET /api/generate/groups");
    }
}
