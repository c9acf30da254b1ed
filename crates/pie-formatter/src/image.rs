//! Data-URL decoding for inline image parts.

use crate::error::FormatterError;
use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;

fn data_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^data:[\w\-/+.]+;base64,[A-Za-z0-9+/=]+$").unwrap())
}

/// Decode a `data:<mime>;base64,<payload>` URL into raw bytes.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, FormatterError> {
    if !data_url_pattern().is_match(url) {
        return Err(FormatterError::InvalidDataUrl(url.to_owned()));
    }
    let payload = url.split_once(";base64,").map(|(_, p)| p).unwrap_or_default();
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| FormatterError::InvalidBase64)
}
