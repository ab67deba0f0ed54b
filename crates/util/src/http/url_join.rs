//! URL assembly helpers shared by the request builder and the transport.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Bytes escaped inside a single path segment. Everything outside the RFC 3986
/// unreserved set is encoded, including `/` and `,`.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b',')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'$')
    .add(b'!')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*');

/// Join a base path and a path fragment with exactly one separator at the seam.
///
/// - base ends with `/` and fragment starts with `/`: one separator is dropped
/// - neither side has a separator: one is inserted
/// - otherwise the two are concatenated
///
/// The fragment's own leading separator is never removed, and an empty side
/// leaves the other untouched.
///
/// # Example
/// ```rust
/// use nac_util::join_url_path;
///
/// assert_eq!(join_url_path("/api/generate/", "/groups"), "/api/generate/groups");
/// assert_eq!(join_url_path("/api/generate", "/groups"), "/api/generate/groups");
/// assert_eq!(join_url_path("/api/generate", "groups"), "/api/generate/groups");
/// ```
pub fn join_url_path(base: &str, fragment: &str) -> String {
    if base.is_empty() {
        return fragment.to_string();
    }
    if fragment.is_empty() {
        return base.to_string();
    }

    match (base.ends_with('/'), fragment.starts_with('/')) {
        (true, true) => format!("{}{}", &base[..base.len() - 1], fragment),
        (false, false) => format!("{base}/{fragment}"),
        _ => format!("{base}{fragment}"),
    }
}

/// Whether `url` already names a scheme and host, and must not be prefixed.
pub fn is_absolute_url(url: &str) -> bool {
    url::Url::parse(url).map(|parsed| parsed.has_host()).unwrap_or(false)
}

/// Percent-encode a value for use as one path segment.
pub fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_never_doubles_the_separator() {
        for base in ["/api/generate", "/api/generate/"] {
            for fragment in ["groups", "/groups"] {
                let joined = join_url_path(base, fragment);
                assert_eq!(joined, "/api/generate/groups", "base={base} fragment={fragment}");
                assert!(!joined.contains("//"));
            }
        }
    }

    #[test]
    fn join_keeps_fragment_leading_separator_when_base_is_empty() {
        assert_eq!(join_url_path("", "/groups"), "/groups");
    }

    #[test]
    fn join_drops_only_one_trailing_separator() {
        assert_eq!(join_url_path("/api//", "/groups"), "/api//groups");
    }

    #[test]
    fn join_with_absolute_base() {
        assert_eq!(join_url_path("https://console.example.com/", "/api"), "https://console.example.com/api");
    }

    #[test]
    fn absolute_url_detection() {
        assert!(is_absolute_url("https://console.example.com/api/groups"));
        assert!(!is_absolute_url("/api/groups"));
        assert!(!is_absolute_url("api/groups"));
    }

    #[test]
    fn segment_encoding_escapes_delimiters() {
        assert_eq!(encode_path_segment("Device Type"), "Device%20Type");
        assert_eq!(encode_path_segment("a,b/c"), "a%2Cb%2Fc");
        assert_eq!(encode_path_segment("radius-1.2_x~"), "radius-1.2_x~");
    }
}
