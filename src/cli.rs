//! Command-line interface.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{parse_timestamp, AuditConfig};
use crate::error::Result;
use crate::key_ring::KeyRingSource;
use crate::report::ReportFormat;
use crate::source::UserQuery;

/// List which data-protection key protects each user's credential fields
/// and whether that key is still usable.
#[derive(Debug, Parser)]
#[command(name = "key-audit", version, about)]
pub struct Cli {
    /// SQLite database containing the user table
    #[arg(env = "KEY_AUDIT_DATABASE")]
    pub database: PathBuf,

    /// JSON key ring snapshot
    #[arg(long, env = "KEY_AUDIT_KEY_RING", conflicts_with = "key_dir")]
    pub key_ring: Option<PathBuf>,

    /// Data-protection key directory (key-*.xml, revocation-*.xml)
    #[arg(long, env = "KEY_AUDIT_KEY_DIR")]
    pub key_dir: Option<PathBuf>,

    /// Classify keys as of this RFC 3339 instant instead of now
    #[arg(long)]
    pub as_of: Option<String>,

    #[arg(long, default_value = "User")]
    pub table: String,

    #[arg(long, default_value = "Id")]
    pub id_column: String,

    #[arg(long, default_value = "MasterPassword")]
    pub master_password_column: String,

    #[arg(long, default_value = "Key")]
    pub key_column: String,

    /// Output format: csv or json
    #[arg(long, default_value = "csv")]
    pub format: ReportFormat,

    /// Omit the CSV header line
    #[arg(long)]
    pub no_header: bool,

    /// Print per-key usage counts to stderr
    #[arg(long)]
    pub summary: bool,

    /// Worker threads used for auditing
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn into_config(self) -> Result<AuditConfig> {
        let key_ring = match (self.key_ring, self.key_dir) {
            (Some(path), _) => KeyRingSource::Json(path),
            (None, Some(dir)) => KeyRingSource::Directory(dir),
            (None, None) => KeyRingSource::None,
        };
        let as_of = self.as_of.as_deref().map(parse_timestamp).transpose()?;
        let query = UserQuery {
            table: self.table,
            id_column: self.id_column,
            master_password_column: self.master_password_column,
            key_column: self.key_column,
        };
        query.validate()?;

        Ok(AuditConfig {
            database: self.database,
            query,
            key_ring,
            as_of,
            format: self.format,
            header: !self.no_header,
            summary: self.summary,
            workers: self.workers.max(1),
        })
    }
}
