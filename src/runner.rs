//! One audit run: load the key ring, fetch records, audit, report.

use std::io::Write;
use std::sync::Arc;

use tracing::info;

use crate::audit::{AuditRow, RecordAuditor};
use crate::config::AuditConfig;
use crate::error::Result;
use crate::key_ring::load_key_ring;
use crate::report::{write_report, write_summary, KeyUsageSummary};
use crate::source::RecordSource;

/// Audit every record from `source` and write the report to `out`.
///
/// The key ring is loaded and `now` is sampled once, before any record is
/// audited. When `config.summary` is set the summary goes to `summary_out`.
pub async fn run<S, W, E>(
    config: &AuditConfig,
    source: &S,
    out: &mut W,
    summary_out: &mut E,
) -> Result<Vec<AuditRow>>
where
    S: RecordSource + ?Sized,
    W: Write,
    E: Write,
{
    let ring = load_key_ring(&config.key_ring)?.map(Arc::new);
    let auditor = RecordAuditor::new(ring, config.now());
    info!(
        as_of = %auditor.now(),
        key_ring = auditor.has_key_ring(),
        "Starting audit"
    );

    let records = source.fetch_records().await?;
    let rows = auditor.audit_concurrent(records, config.workers).await?;

    write_report(out, &rows, config.format, config.header)?;

    let summary = KeyUsageSummary::from_rows(&rows);
    info!(
        records = summary.records,
        keys = summary.keys.len(),
        malformed = summary.malformed_fields,
        truncated = summary.too_short_fields,
        "Audit complete"
    );
    if config.summary {
        write_summary(summary_out, &summary)?;
    }
    Ok(rows)
}

/// Run against the SQLite database named in `config`.
#[cfg(feature = "sqlite")]
pub async fn run_sqlite<W: Write, E: Write>(
    config: &AuditConfig,
    out: &mut W,
    summary_out: &mut E,
) -> Result<Vec<AuditRow>> {
    let source = crate::source::SqliteRecordSource::new(&config.database, config.query.clone());
    run(config, &source, out, summary_out).await
}
