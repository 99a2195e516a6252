//! Per-record auditing: decode, extract, resolve for each monitored field.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{AuditError, Result};
use crate::key_id::{extract_key_id, KeyId};
use crate::key_ring::{resolve, KeyRing, KeyStatus};
use crate::payload::decode_protected_field;

/// A user row as read from the data store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub master_password: Option<String>,
    pub key: Option<String>,
}

impl UserRecord {
    pub fn new(
        id: impl Into<String>,
        master_password: Option<String>,
        key: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            master_password,
            key,
        }
    }
}

/// Why a protected field yielded no key id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldIssue {
    /// The body after the marker is not valid base64url.
    Malformed,
    /// The decoded payload ends before the key id does.
    TooShort,
}

/// Audit result for one field.
///
/// `status` is `None` whenever `key_id` is, and also when no key ring was
/// supplied for the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldAudit {
    pub key_id: Option<KeyId>,
    pub status: Option<KeyStatus>,
    pub issue: Option<FieldIssue>,
}

/// Audit result for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub record_id: String,
    pub master_password: FieldAudit,
    pub key: FieldAudit,
}

fn audit_field(
    record_id: &str,
    field_name: &'static str,
    value: Option<&str>,
    ring: Option<&KeyRing>,
    now: DateTime<Utc>,
) -> FieldAudit {
    let payload = match decode_protected_field(value) {
        Ok(Some(payload)) => payload,
        Ok(None) => return FieldAudit::default(),
        Err(e) => {
            debug!(record_id, field = field_name, error = %e, "Undecodable protected field");
            return FieldAudit {
                issue: Some(FieldIssue::Malformed),
                ..FieldAudit::default()
            };
        }
    };

    let key_id = match extract_key_id(&payload) {
        Ok(key_id) => key_id,
        Err(e) => {
            debug!(record_id, field = field_name, error = %e, "No key id in payload");
            return FieldAudit {
                issue: Some(FieldIssue::TooShort),
                ..FieldAudit::default()
            };
        }
    };

    FieldAudit {
        key_id: Some(key_id),
        status: ring.map(|ring| resolve(ring, &key_id, now)),
        issue: None,
    }
}

/// Audit both monitored fields of a record.
pub fn audit(record: &UserRecord, ring: Option<&KeyRing>, now: DateTime<Utc>) -> AuditRow {
    AuditRow {
        record_id: record.id.clone(),
        master_password: audit_field(
            &record.id,
            "MasterPassword",
            record.master_password.as_deref(),
            ring,
            now,
        ),
        key: audit_field(&record.id, "Key", record.key.as_deref(), ring, now),
    }
}

/// Audits records against one key ring snapshot and one fixed `now`.
#[derive(Debug, Clone)]
pub struct RecordAuditor {
    ring: Option<Arc<KeyRing>>,
    now: DateTime<Utc>,
}

impl RecordAuditor {
    pub fn new(ring: Option<Arc<KeyRing>>, now: DateTime<Utc>) -> Self {
        Self { ring, now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn has_key_ring(&self) -> bool {
        self.ring.is_some()
    }

    pub fn audit(&self, record: &UserRecord) -> AuditRow {
        audit(record, self.ring.as_deref(), self.now)
    }

    /// Audit records in order.
    pub fn audit_all(&self, records: &[UserRecord]) -> Vec<AuditRow> {
        records.iter().map(|record| self.audit(record)).collect()
    }

    /// Audit records on up to `workers` blocking tasks. Output order matches
    /// input order.
    pub async fn audit_concurrent(
        &self,
        records: Vec<UserRecord>,
        workers: usize,
    ) -> Result<Vec<AuditRow>> {
        if workers <= 1 || records.len() <= 1 {
            return Ok(self.audit_all(&records));
        }

        let workers = workers.min(records.len());
        let chunk_size = records.len().div_ceil(workers);
        let mut handles = Vec::with_capacity(workers);
        let mut records = records.into_iter();
        loop {
            let chunk: Vec<UserRecord> = records.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let auditor = self.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                auditor.audit_all(&chunk)
            }));
        }

        let mut rows = Vec::new();
        for handle in handles {
            let chunk_rows = handle
                .await
                .map_err(|e| AuditError::Task(e.to_string()))?;
            rows.extend(chunk_rows);
        }
        Ok(rows)
    }
}
