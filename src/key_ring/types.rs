use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::key_id::KeyId;

/// Lifecycle metadata for one known key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRingEntry {
    pub id: KeyId,
    /// When the key was written to the store. Only used for mass revocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<DateTime<Utc>>,
    pub activation: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
    #[serde(default)]
    pub revoked: bool,
}

impl KeyRingEntry {
    pub fn new(id: KeyId, activation: DateTime<Utc>, expiration: DateTime<Utc>) -> Self {
        Self {
            id,
            creation: None,
            activation,
            expiration,
            revoked: false,
        }
    }

    pub fn revoked(mut self) -> Self {
        self.revoked = true;
        self
    }

    /// Creation date if recorded, otherwise the activation date.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.creation.unwrap_or(self.activation)
    }
}

/// Lifecycle status of the key behind a protected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyStatus {
    /// No key with this id in the snapshot.
    NotFound,
    /// Known but not yet activated.
    Created,
    Active,
    Expired,
    Revoked,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::NotFound => "NotFound",
            KeyStatus::Created => "Created",
            KeyStatus::Active => "Active",
            KeyStatus::Expired => "Expired",
            KeyStatus::Revoked => "Revoked",
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of known keys, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    entries: HashMap<KeyId, KeyRingEntry>,
}

impl KeyRing {
    /// Build a snapshot. Each key id may appear only once.
    pub fn from_entries(entries: impl IntoIterator<Item = KeyRingEntry>) -> Result<Self> {
        let mut map = HashMap::new();
        for entry in entries {
            let id = entry.id;
            if map.insert(id, entry).is_some() {
                return Err(AuditError::DuplicateKey(id));
            }
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, id: &KeyId) -> Option<&KeyRingEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
