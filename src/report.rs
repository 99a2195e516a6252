//! Report rendering.

use std::collections::BTreeMap;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::audit::{AuditRow, FieldAudit, FieldIssue};
use crate::error::{AuditError, Result};
use crate::key_id::KeyId;
use crate::key_ring::KeyStatus;

pub const CSV_HEADER: &str = "Id,MasterPasswordKeyId,MasterPasswordKeyStatus,KeyId,KeyStatus";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Comma-separated, absent values as empty cells.
    #[default]
    Csv,
    /// One JSON object per line, absent values as `null`.
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" | "jsonl" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format \"{}\"", other)),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonRow<'a> {
    id: &'a str,
    master_password_key_id: Option<KeyId>,
    master_password_key_status: Option<KeyStatus>,
    key_id: Option<KeyId>,
    key_status: Option<KeyStatus>,
}

impl<'a> From<&'a AuditRow> for JsonRow<'a> {
    fn from(row: &'a AuditRow) -> Self {
        Self {
            id: &row.record_id,
            master_password_key_id: row.master_password.key_id,
            master_password_key_status: row.master_password.status,
            key_id: row.key.key_id,
            key_status: row.key.status,
        }
    }
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render one row as a CSV line (no trailing newline).
pub fn csv_line(row: &AuditRow) -> String {
    [
        csv_cell(&row.record_id),
        opt_cell(row.master_password.key_id),
        opt_cell(row.master_password.status),
        opt_cell(row.key.key_id),
        opt_cell(row.key.status),
    ]
    .join(",")
}

/// Write all rows in `format`.
pub fn write_report<W: Write>(
    out: &mut W,
    rows: &[AuditRow],
    format: ReportFormat,
    header: bool,
) -> Result<()> {
    match format {
        ReportFormat::Csv => {
            if header {
                writeln!(out, "{}", CSV_HEADER).map_err(AuditError::Output)?;
            }
            for row in rows {
                writeln!(out, "{}", csv_line(row)).map_err(AuditError::Output)?;
            }
        }
        ReportFormat::Json => {
            for row in rows {
                serde_json::to_writer(&mut *out, &JsonRow::from(row))
                    .map_err(|e| AuditError::Output(e.into()))?;
                writeln!(out).map_err(AuditError::Output)?;
            }
        }
    }
    out.flush().map_err(AuditError::Output)
}

/// How many fields reference one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsage {
    pub status: Option<KeyStatus>,
    pub master_password_fields: usize,
    pub key_fields: usize,
}

impl KeyUsage {
    pub fn total(&self) -> usize {
        self.master_password_fields + self.key_fields
    }
}

/// Per-key dependency counts across a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyUsageSummary {
    pub records: usize,
    pub keys: BTreeMap<KeyId, KeyUsage>,
    pub unprotected_fields: usize,
    pub malformed_fields: usize,
    pub too_short_fields: usize,
}

impl KeyUsageSummary {
    pub fn from_rows(rows: &[AuditRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            summary.records += 1;
            summary.add_field(&row.master_password, true);
            summary.add_field(&row.key, false);
        }
        summary
    }

    fn add_field(&mut self, field: &FieldAudit, master_password: bool) {
        match (field.key_id, field.issue) {
            (Some(id), _) => {
                let usage = self.keys.entry(id).or_default();
                usage.status = field.status;
                if master_password {
                    usage.master_password_fields += 1;
                } else {
                    usage.key_fields += 1;
                }
            }
            (None, Some(FieldIssue::Malformed)) => self.malformed_fields += 1,
            (None, Some(FieldIssue::TooShort)) => self.too_short_fields += 1,
            (None, None) => self.unprotected_fields += 1,
        }
    }

    /// Number of fields whose key has the given status.
    pub fn fields_with_status(&self, status: KeyStatus) -> usize {
        self.keys
            .values()
            .filter(|usage| usage.status == Some(status))
            .map(KeyUsage::total)
            .sum()
    }
}

/// Human-readable summary.
pub fn write_summary<W: Write>(out: &mut W, summary: &KeyUsageSummary) -> Result<()> {
    let mut write = || -> std::io::Result<()> {
        writeln!(out, "Audited {} records", summary.records)?;
        for (id, usage) in &summary.keys {
            writeln!(
                out,
                "  {}  {:<9}  master password: {:>6}  key: {:>6}",
                id,
                usage.status.map(|s| s.as_str()).unwrap_or("-"),
                usage.master_password_fields,
                usage.key_fields,
            )?;
        }
        writeln!(
            out,
            "  on revoked keys:    {}",
            summary.fields_with_status(KeyStatus::Revoked)
        )?;
        writeln!(
            out,
            "  on expired keys:    {}",
            summary.fields_with_status(KeyStatus::Expired)
        )?;
        writeln!(out, "  unprotected fields: {}", summary.unprotected_fields)?;
        writeln!(out, "  malformed fields:   {}", summary.malformed_fields)?;
        writeln!(out, "  truncated fields:   {}", summary.too_short_fields)?;
        out.flush()
    };
    write().map_err(AuditError::Output)
}
