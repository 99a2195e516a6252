//! SQLite-backed record source.

use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, OpenFlags, Row};
use tracing::info;
use uuid::Uuid;

use super::{RecordSource, UserQuery};
use crate::audit::UserRecord;
use crate::error::{AuditError, Result};

/// Reads user records from a SQLite database, opened read-only.
#[derive(Debug, Clone)]
pub struct SqliteRecordSource {
    path: PathBuf,
    query: UserQuery,
}

impl SqliteRecordSource {
    pub fn new(path: impl Into<PathBuf>, query: UserQuery) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }

    fn read_all(&self) -> Result<Vec<UserRecord>> {
        let sql = self.query.to_sql()?;
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| {
                Ok(UserRecord {
                    id: read_id(row, 0)?,
                    master_password: row.get(1)?,
                    key: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        info!(
            records = records.len(),
            database = %self.path.display(),
            "Fetched user records"
        );
        Ok(records)
    }
}

/// Ids may be stored as text, integers, or 16-byte GUID blobs.
///
/// GUID blobs use the same mixed-endian layout as key ids inside payloads.
fn read_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    match row.get_ref(idx)? {
        ValueRef::Text(text) => Ok(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Integer(n) => Ok(n.to_string()),
        ValueRef::Blob(bytes) => match <[u8; 16]>::try_from(bytes) {
            Ok(guid) => Ok(Uuid::from_bytes_le(guid).hyphenated().to_string()),
            Err(_) => Err(rusqlite::Error::InvalidColumnType(
                idx,
                "id".to_string(),
                Type::Blob,
            )),
        },
        ValueRef::Real(_) => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "id".to_string(),
            Type::Real,
        )),
        ValueRef::Null => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "id".to_string(),
            Type::Null,
        )),
    }
}

#[async_trait]
impl RecordSource for SqliteRecordSource {
    async fn fetch_records(&self) -> Result<Vec<UserRecord>> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.read_all())
            .await
            .map_err(|e| AuditError::Task(e.to_string()))?
    }
}
