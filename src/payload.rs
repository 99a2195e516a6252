//! Recognition and decoding of protected credential fields.
//!
//! A protected field is stored as `P|` followed by the URL-safe base64 form
//! of the protected payload. Anything else is plaintext or a legacy format
//! and carries no key id.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use thiserror::Error;

/// Marker that prefixes every protected field.
pub const PROTECTED_PREFIX: &str = "P|";

/// URL-safe alphabet; padding is accepted but never required.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed base64url body: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decode a stored field into its protected payload bytes.
///
/// Returns `Ok(None)` for absent, empty, or unprefixed values. Only a
/// prefixed value with a malformed body is an error.
pub fn decode_protected_field(field: Option<&str>) -> Result<Option<Vec<u8>>, DecodeError> {
    let body = match field.and_then(|f| f.strip_prefix(PROTECTED_PREFIX)) {
        Some(body) => body,
        None => return Ok(None),
    };
    Ok(Some(BASE64URL.decode(body)?))
}

/// Encode payload bytes as a protected field value.
pub fn encode_protected_field(payload: &[u8]) -> String {
    format!("{}{}", PROTECTED_PREFIX, BASE64URL.encode(payload))
}
