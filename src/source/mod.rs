//! Record sources: where user rows come from.

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::audit::UserRecord;
use crate::error::{AuditError, Result};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRecordSource;

/// Yields the records to audit, in a stable order.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<UserRecord>>;
}

/// In-memory records.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSource {
    records: Vec<UserRecord>,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<UserRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn fetch_records(&self) -> Result<Vec<UserRecord>> {
        Ok(self.records.clone())
    }
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Table and column names for the user query.
///
/// Names are spliced into SQL, so each one must be a plain identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub table: String,
    pub id_column: String,
    pub master_password_column: String,
    pub key_column: String,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            table: "User".to_string(),
            id_column: "Id".to_string(),
            master_password_column: "MasterPassword".to_string(),
            key_column: "Key".to_string(),
        }
    }
}

impl UserQuery {
    pub fn validate(&self) -> Result<()> {
        for name in [
            &self.table,
            &self.id_column,
            &self.master_password_column,
            &self.key_column,
        ] {
            if !IDENTIFIER.is_match(name) {
                return Err(AuditError::InvalidIdentifier(name.clone()));
            }
        }
        Ok(())
    }

    /// The SELECT statement, with every identifier quoted.
    pub fn to_sql(&self) -> Result<String> {
        self.validate()?;
        Ok(format!(
            "SELECT \"{}\", \"{}\", \"{}\" FROM \"{}\" ORDER BY rowid",
            self.id_column, self.master_password_column, self.key_column, self.table
        ))
    }
}
