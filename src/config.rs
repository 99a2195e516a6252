use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::{AuditError, Result};
use crate::key_ring::KeyRingSource;
use crate::report::ReportFormat;
use crate::source::UserQuery;

/// Everything an audit run needs.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// SQLite database holding the user table.
    pub database: PathBuf,
    pub query: UserQuery,
    pub key_ring: KeyRingSource,
    /// Classify keys as of this instant instead of the current time.
    pub as_of: Option<DateTime<Utc>>,
    pub format: ReportFormat,
    pub header: bool,
    /// Also write a per-key summary to stderr.
    pub summary: bool,
    /// Blocking workers used for auditing. 1 audits on the calling task.
    pub workers: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::new(),
            query: UserQuery::default(),
            key_ring: KeyRingSource::None,
            as_of: None,
            format: ReportFormat::Csv,
            header: true,
            summary: false,
            workers: 1,
        }
    }
}

impl AuditConfig {
    /// The single `now` used for every record in the run.
    pub fn now(&self) -> DateTime<Utc> {
        self.as_of.unwrap_or_else(Utc::now)
    }
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AuditError::InvalidTimestamp(s.to_string()))
}
