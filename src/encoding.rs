//! Character decoding for materialized documents.
//!
//! Local files and the input stream must be valid UTF-8: anything else is a
//! decode failure. Fetched pages are transcoded using the charset declared in
//! the HTTP header or in the document's `<meta>` tags.

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::MaterializationError;

/// Match `<meta charset="...">` tag
#[allow(clippy::expect_used)]
static CHARSET_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s>;]+)"#).expect("valid regex")
});

/// Match `charset=...` inside a Content-Type header value
#[allow(clippy::expect_used)]
static HEADER_CHARSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).expect("valid regex"));

/// Decode bytes that must be UTF-8.
///
/// `origin` names the source in the error (a path or `<stdin>`).
pub fn decode_utf8(bytes: Vec<u8>, origin: &str) -> Result<String, MaterializationError> {
    String::from_utf8(bytes).map_err(|_| MaterializationError::Decode(origin.to_string()))
}

/// Detect the encoding of an HTML page.
///
/// The header charset wins, then `<meta charset>` / `http-equiv` within the
/// first 1024 bytes, then UTF-8.
#[must_use]
pub fn detect_encoding(html: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some(encoding) = content_type
        .and_then(|ct| capture(&HEADER_CHARSET_RE, ct))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding;
    }

    let head = String::from_utf8_lossy(&html[..html.len().min(1024)]);
    capture(&CHARSET_META_RE, &head)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Transcode a fetched page to UTF-8, replacing invalid sequences with �.
#[must_use]
pub fn transcode_to_utf8(html: &[u8], content_type: Option<&str>) -> String {
    let encoding = detect_encoding(html, content_type);
    if encoding == UTF_8 {
        return String::from_utf8_lossy(html).into_owned();
    }
    let (decoded, _, _) = encoding.decode(html);
    decoded.into_owned()
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
