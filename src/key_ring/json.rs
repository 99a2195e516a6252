//! JSON key ring snapshots.
//!
//! ```json
//! [
//!   { "id": "80732141-ec8f-4b80-af9c-c4d2d1ff8901",
//!     "activation": "2024-01-01T00:00:00Z",
//!     "expiration": "2024-04-01T00:00:00Z",
//!     "revoked": false }
//! ]
//! ```

use std::path::PathBuf;

use super::types::{KeyRing, KeyRingEntry};
use super::KeyRingLoader;
use crate::error::{AuditError, Result};

/// Parse a snapshot from JSON text.
pub fn parse_key_ring_json(
    json: &str,
) -> std::result::Result<Vec<KeyRingEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Loads a key ring from a JSON snapshot file.
pub struct JsonKeyRingLoader {
    path: PathBuf,
}

impl JsonKeyRingLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyRingLoader for JsonKeyRingLoader {
    fn load(&self) -> Result<KeyRing> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| AuditError::Io {
            path: self.path.clone(),
            source,
        })?;
        let entries = parse_key_ring_json(&text).map_err(|source| AuditError::KeyRingJson {
            path: self.path.clone(),
            source,
        })?;
        KeyRing::from_entries(entries)
    }
}
