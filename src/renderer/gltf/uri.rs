//! Resolution of the `uri` fields of buffers and images.

use std::fs;
use std::path::Path;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use super::ImportError;

/// Standard alphabet. Trailing padding is optional.
const DATA_URI_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Reads the bytes a `uri` points at: inline base64 `data:` URIs are
/// decoded, anything else is a path relative to `base_dir`.
pub fn read_uri(uri: &str, base_dir: &Path) -> Result<Vec<u8>, ImportError> {
    if let Some(rest) = uri.strip_prefix("data:") {
        let (_, encoded) = rest
            .split_once(";base64,")
            .ok_or_else(|| ImportError::unsupported("data URI without base64 encoding"))?;
        return DATA_URI_BASE64
            .decode(encoded.trim())
            .map_err(|err| ImportError::parse(format!("data URI contains invalid base64: {err}")));
    }
    let path = base_dir.join(percent_decode(uri));
    fs::read(&path).map_err(|source| ImportError::Io { path, source })
}

fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}
