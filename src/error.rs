use std::path::PathBuf;

use thiserror::Error;

use crate::key_id::KeyId;

/// Fatal errors for an audit run.
///
/// Per-field problems (bad encoding, truncated payloads) never show up here;
/// they are recorded on the row as a [`crate::audit::FieldIssue`].
#[derive(Debug, Error)]
pub enum AuditError {
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid key ring snapshot {path}: {source}")]
    KeyRingJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid key file {path}: {reason}")]
    KeyRingXml { path: PathBuf, reason: String },

    #[error("Key {0} appears more than once in the key ring")]
    DuplicateKey(KeyId),

    #[error("Invalid SQL identifier: \"{0}\"")]
    InvalidIdentifier(String),

    #[error("Invalid timestamp \"{0}\": expected RFC 3339")]
    InvalidTimestamp(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Failed to write report: {0}")]
    Output(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;
