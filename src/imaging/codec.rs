//! Data URL codec for storing encoded images inline in documents.
//!
//! Stored references look like `data:image/jpeg;base64,/9j/4AAQ...`. A value
//! that fails to decode means "image unavailable" to readers, never a fatal
//! error for the surrounding request.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

const PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("not a data URL (missing 'data:' prefix)")]
    MissingPrefix,
    #[error("data URL is not base64-encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Wrap encoded image bytes as a `data:<mime>;base64,` reference.
pub fn bytes_to_text(bytes: &[u8], mime: &str) -> String {
    format!("{PREFIX}{mime}{BASE64_MARKER},{}", STANDARD.encode(bytes))
}

/// Inverse of [`bytes_to_text`]: returns the raw bytes and the MIME type.
///
/// The payload is split at the last comma, so MIME strings containing commas
/// survive the round trip (base64 never contains one).
pub fn text_to_bytes(text: &str) -> Result<(Vec<u8>, String), FormatError> {
    let rest = text.strip_prefix(PREFIX).ok_or(FormatError::MissingPrefix)?;
    let (header, payload) = rest.rsplit_once(',').ok_or(FormatError::NotBase64)?;
    let mime = header
        .strip_suffix(BASE64_MARKER)
        .ok_or(FormatError::NotBase64)?;
    let bytes = STANDARD.decode(payload)?;
    Ok((bytes, mime.to_string()))
}

/// True if `url` is an inline data reference rather than a link.
pub fn is_data_url(url: &str) -> bool {
    url.starts_with(PREFIX)
}
