//! RFC 2397 `data:` URLs
//!
//! Inline configs and certificate authorities arrive as data URLs, either
//! base64 or percent-encoded.

use crate::IgnitionError;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

/// Decode the payload of a `data:` URL
pub fn decode(url: &str) -> Result<Vec<u8>, IgnitionError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| IgnitionError::InvalidData("missing data: prefix".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| IgnitionError::InvalidData("missing ',' before payload".to_string()))?;

    // Malformed escapes are kept literally
    let bytes = urlencoding::decode_binary(payload.as_bytes()).into_owned();
    let is_base64 = meta
        .split(';')
        .any(|param| param.trim().eq_ignore_ascii_case("base64"));
    if !is_base64 {
        return Ok(bytes);
    }

    let cleaned: Vec<u8> = bytes.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
    BASE64
        .decode(cleaned)
        .map_err(|e| IgnitionError::InvalidData(format!("invalid base64: {}", e)))
}

/// Encode bytes as a base64 `data:` URL
pub fn encode(data: &[u8]) -> String {
    format!("data:;base64,{}", BASE64.encode(data))
}
