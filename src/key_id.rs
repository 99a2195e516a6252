//! Key id embedded in a protected payload.
//!
//! Payload layout: [magic header:4B][key id:16B][IV, ciphertext and MAC...]
//!
//! The 16 key id bytes use the mixed-endian GUID layout: the first three
//! groups (4, 2 and 2 bytes) are little-endian, the last 8 bytes are taken
//! in order. Reading them any other way yields ids that do not match the
//! key store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of the format header that precedes the key id.
pub const PAYLOAD_HEADER_LEN: usize = 4;

/// Length of the key id in bytes.
pub const KEY_ID_LEN: usize = 16;

/// Minimum payload length that contains a complete key id.
pub const MIN_PAYLOAD_LEN: usize = PAYLOAD_HEADER_LEN + KEY_ID_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Payload too short: need at least {} bytes, got {len}", MIN_PAYLOAD_LEN)]
    TooShort { len: usize },
}

/// 128-bit identifier of a data-protection key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(Uuid);

impl KeyId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Interpret 16 bytes in the mixed-endian GUID layout.
    pub fn from_guid_bytes(bytes: [u8; KEY_ID_LEN]) -> Self {
        Self(Uuid::from_bytes_le(bytes))
    }

    /// The 16 bytes as they appear inside a payload.
    pub fn to_guid_bytes(&self) -> [u8; KEY_ID_LEN] {
        self.0.to_bytes_le()
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Lowercase hyphenated, the same text form the key store uses
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for KeyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Read the key id at bytes `[4, 20)` of a decoded payload.
///
/// The header and everything after the key id are ignored.
pub fn extract_key_id(payload: &[u8]) -> Result<KeyId, ExtractionError> {
    let raw = payload
        .get(PAYLOAD_HEADER_LEN..MIN_PAYLOAD_LEN)
        .ok_or(ExtractionError::TooShort { len: payload.len() })?;
    let bytes: [u8; KEY_ID_LEN] = raw
        .try_into()
        .map_err(|_| ExtractionError::TooShort { len: payload.len() })?;
    Ok(KeyId::from_guid_bytes(bytes))
}
