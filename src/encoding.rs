//! Character encoding detection and transcoding.
//!
//! Handles the charsets commonly found in web pages: a byte-order mark wins,
//! then charset declarations in HTML meta tags, then UTF-8 as the web
//! default. Decoding is always lossy; invalid sequences become U+FFFD
//! rather than errors.

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::sync::LazyLock;

// Module-level regex patterns for charset detection
// These are compiled once at first use and reused throughout the program lifetime

/// Match `<meta charset="...">` tag
#[allow(clippy::expect_used)]
static CHARSET_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s>]+)"#).expect("valid regex")
});

/// Match `<meta http-equiv="Content-Type" content="...; charset=...">` tag
#[allow(clippy::expect_used)]
static CONTENT_TYPE_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+http-equiv\s*=\s*["']?content-type["']?[^>]+content\s*=\s*["']?[^"'>]*;\s*charset\s*=\s*([^"'\s>]+)"#).expect("valid regex")
});

/// Resolve a user-supplied encoding label to an encoding.
///
/// Returns `None` for labels `encoding_rs` does not recognize.
#[must_use]
pub fn resolve_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Detect character encoding from HTML bytes.
///
/// Looks for charset declarations in the following order:
/// 1. Byte-order mark (UTF-8, UTF-16LE, UTF-16BE)
/// 2. `<meta charset="...">`
/// 3. `<meta http-equiv="Content-Type" content="...; charset=...">`
/// 4. Defaults to UTF-8 if no declaration found
///
/// Only examines the first 1024 bytes for performance.
#[must_use]
pub fn detect_encoding(html: &[u8]) -> &'static Encoding {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(html) {
        return encoding;
    }

    // Only look at first 1024 bytes for performance
    let head = &html[..html.len().min(1024)];

    // Convert to string with lossy conversion to search for meta tags
    let head_str = String::from_utf8_lossy(head);

    // Try <meta charset="...">
    if let Some(charset) = extract_charset(&head_str) {
        if let Some(encoding) = Encoding::for_label(charset.as_bytes()) {
            return encoding;
        }
    }

    // Try <meta http-equiv="Content-Type" content="...; charset=...">
    if let Some(charset) = extract_content_type_charset(&head_str) {
        if let Some(encoding) = Encoding::for_label(charset.as_bytes()) {
            return encoding;
        }
    }

    // Default to UTF-8 (standard web default)
    UTF_8
}

/// Extract charset from `<meta charset="...">` tag.
fn extract_charset(html: &str) -> Option<String> {
    CHARSET_META_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract charset from `<meta http-equiv="Content-Type" content="...; charset=...">` tag.
fn extract_content_type_charset(html: &str) -> Option<String> {
    CONTENT_TYPE_CHARSET_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decode HTML bytes to a UTF-8 string with a known encoding.
///
/// Uses lossy conversion so that invalid characters become the Unicode
/// replacement character instead of failing the parse.
#[must_use]
pub fn decode_with(html: &[u8], encoding: &'static Encoding) -> String {
    if encoding == UTF_8 {
        // Fast path for UTF-8: just do lossy conversion
        return String::from_utf8_lossy(html).into_owned();
    }

    let (decoded, _encoding_used, _had_errors) = encoding.decode(html);
    decoded.into_owned()
}

/// Transcode HTML bytes to a UTF-8 string, sniffing the encoding.
///
/// # Examples
///
/// ```
/// use scrapling::encoding::transcode_to_utf8;
///
/// let html = b"<html><body>Hello, World!</body></html>";
/// let (utf8_str, encoding) = transcode_to_utf8(html);
/// assert!(utf8_str.contains("Hello, World!"));
/// assert_eq!(encoding.name(), "UTF-8");
/// ```
#[must_use]
pub fn transcode_to_utf8(html: &[u8]) -> (String, &'static Encoding) {
    let encoding = detect_encoding(html);
    (decode_with(html, encoding), encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_utf8_from_meta_charset() {
        let html = br#"<html><head><meta charset="utf-8"></head><body>Test</body></html>"#;
        let encoding = detect_encoding(html);
        assert_eq!(encoding, UTF_8);
    }

    #[test]
    fn detect_iso88591_from_meta_charset() {
        let html = br#"<html><head><meta charset="ISO-8859-1"></head><body>Test</body></html>"#;
        let encoding = detect_encoding(html);
        // encoding_rs maps ISO-8859-1 to windows-1252 per WHATWG spec
        // (they are functionally equivalent for web content)
        assert_eq!(encoding.name(), "windows-1252");
    }

    #[test]
    fn detect_charset_from_content_type() {
        let html = br#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=ISO-8859-1"></head><body>Test</body></html>"#;
        let encoding = detect_encoding(html);
        assert_eq!(encoding.name(), "windows-1252");
    }

    #[test]
    fn bom_wins_over_meta() {
        let mut html = vec![0xEF, 0xBB, 0xBF];
        html.extend_from_slice(br#"<meta charset="ISO-8859-1"><body>Test</body>"#);
        let encoding = detect_encoding(&html);
        assert_eq!(encoding, UTF_8);
    }

    #[test]
    fn default_to_utf8_when_no_charset() {
        let html = b"<html><body>Test</body></html>";
        let encoding = detect_encoding(html);
        assert_eq!(encoding, UTF_8);
    }

    #[test]
    fn transcode_utf8_passthrough() {
        let html = b"<html><body>Hello, World!</body></html>";
        let (result, _) = transcode_to_utf8(html);
        assert_eq!(result, "<html><body>Hello, World!</body></html>");
    }

    #[test]
    fn transcode_iso88591_to_utf8() {
        // ISO-8859-1 encoded HTML with special character (é = 0xE9)
        let html = b"<html><head><meta charset=\"ISO-8859-1\"></head><body>Caf\xE9</body></html>";
        let (result, _) = transcode_to_utf8(html);
        assert!(result.contains("Café"));
    }

    #[test]
    fn handle_invalid_encoding_gracefully() {
        // Invalid UTF-8 sequence
        let html = b"<html><body>Test \xFF\xFE Invalid</body></html>";
        let (result, _) = transcode_to_utf8(html);
        // Should contain replacement characters but not panic
        assert!(result.contains("Test"));
        assert!(result.contains("Invalid"));
    }

    #[test]
    fn resolve_known_and_unknown_labels() {
        assert!(resolve_label("utf-8").is_some());
        assert!(resolve_label("Windows-1252").is_some());
        assert!(resolve_label("not-a-charset").is_none());
    }

    #[test]
    fn extract_charset_without_quotes() {
        let html = "<meta charset=utf-8>";
        let charset = extract_charset(html);
        assert_eq!(charset, Some("utf-8".to_string()));
    }
}
