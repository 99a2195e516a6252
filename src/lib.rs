//! Audit which data-protection key protected each stored credential field,
//! and whether that key is still usable.
//!
//! Protected fields are stored as `P|<base64url payload>`. The payload
//! carries a 4-byte header followed by the 16-byte id of the key that
//! produced it. Each id is classified against a key ring snapshot as
//! `NotFound`, `Created`, `Active`, `Expired` or `Revoked`.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod key_id;
pub mod key_ring;
pub mod logging;
pub mod payload;
pub mod report;
pub mod runner;
pub mod source;

pub use audit::{audit, AuditRow, FieldAudit, FieldIssue, RecordAuditor, UserRecord};
pub use config::AuditConfig;
pub use error::{AuditError, Result};
pub use key_id::{extract_key_id, ExtractionError, KeyId};
pub use key_ring::{
    load_key_ring, resolve, KeyRing, KeyRingEntry, KeyRingLoader, KeyRingSource, KeyStatus,
};
pub use payload::{decode_protected_field, DecodeError, PROTECTED_PREFIX};
pub use report::{write_report, KeyUsageSummary, ReportFormat};
pub use source::{MemoryRecordSource, RecordSource, UserQuery};
#[cfg(feature = "sqlite")]
pub use source::SqliteRecordSource;
