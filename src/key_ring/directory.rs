//! Key ring loaded from a data-protection key directory.
//!
//! The directory holds one XML document per key and one per revocation:
//!
//! ```xml
//! <key id="80732141-ec8f-4b80-af9c-c4d2d1ff8901" version="1">
//!   <creationDate>2015-03-19T23:32:02.3949887Z</creationDate>
//!   <activationDate>2015-03-19T23:32:02.3839429Z</activationDate>
//!   <expirationDate>2015-06-17T23:32:02.3839429Z</expirationDate>
//!   <descriptor>...</descriptor>
//! </key>
//!
//! <revocation version="1">
//!   <revocationDate>2015-03-20T22:45:30.2616742Z</revocationDate>
//!   <key id="eb4fc299-8808-409d-8a34-23fc83d026c9" />
//!   <reason>human-readable reason</reason>
//! </revocation>
//! ```
//!
//! A revocation with `<key id="*" />` revokes every key created at or
//! before its revocation date. Only the elements above are read; key
//! material in `<descriptor>` is never touched.

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};

use super::types::{KeyRing, KeyRingEntry};
use super::KeyRingLoader;
use crate::error::{AuditError, Result};
use crate::key_id::KeyId;

static REVOCATION_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<revocation[\s>]").expect("valid regex"));
static KEY_ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<key\s[^>]*\bid\s*=\s*"([^"]*)""#).expect("valid regex")
});

fn element_text<'a>(xml: &'a str, element: &str) -> Option<&'a str> {
    let open = format!("<{}>", element);
    let close = format!("</{}>", element);
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml[start..end].trim())
}

fn date_element(xml: &str, element: &str) -> std::result::Result<DateTime<Utc>, String> {
    let text = element_text(xml, element).ok_or_else(|| format!("missing <{}>", element))?;
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad <{}> \"{}\": {}", element, text, e))
}

fn key_attribute(xml: &str) -> std::result::Result<&str, String> {
    KEY_ROOT
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| "missing <key id=\"...\">".to_string())
}

fn parse_key_id(id: &str) -> std::result::Result<KeyId, String> {
    id.parse().map_err(|e| format!("bad key id \"{}\": {}", id, e))
}

/// Which key(s) a revocation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationTarget {
    Key(KeyId),
    /// Every key created at or before the revocation date.
    AllCreatedBefore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revocation {
    pub target: RevocationTarget,
    pub revoked_at: DateTime<Utc>,
}

/// One parsed XML document from the key directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDocument {
    Key(KeyRingEntry),
    Revocation(Revocation),
}

/// Parse a key or revocation document.
pub fn parse_key_document(xml: &str) -> std::result::Result<KeyDocument, String> {
    if REVOCATION_ROOT.is_match(xml) {
        let revoked_at = date_element(xml, "revocationDate")?;
        let id = key_attribute(xml)?;
        let target = if id == "*" {
            RevocationTarget::AllCreatedBefore
        } else {
            RevocationTarget::Key(parse_key_id(id)?)
        };
        return Ok(KeyDocument::Revocation(Revocation { target, revoked_at }));
    }

    let id = parse_key_id(key_attribute(xml)?)?;
    Ok(KeyDocument::Key(KeyRingEntry {
        id,
        creation: Some(date_element(xml, "creationDate")?),
        activation: date_element(xml, "activationDate")?,
        expiration: date_element(xml, "expirationDate")?,
        revoked: false,
    }))
}

/// Apply revocations to parsed keys.
pub fn apply_revocations(entries: &mut [KeyRingEntry], revocations: &[Revocation]) {
    for revocation in revocations {
        for entry in entries.iter_mut() {
            let hit = match &revocation.target {
                RevocationTarget::Key(id) => entry.id == *id,
                RevocationTarget::AllCreatedBefore => entry.created_at() <= revocation.revoked_at,
            };
            if hit {
                entry.revoked = true;
            }
        }
    }
}

/// Loads a key ring from a directory of XML key documents.
pub struct KeyDirectoryLoader {
    dir: PathBuf,
}

impl KeyDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn io_error(&self, source: std::io::Error) -> AuditError {
        AuditError::Io {
            path: self.dir.clone(),
            source,
        }
    }
}

impl KeyRingLoader for KeyDirectoryLoader {
    fn load(&self) -> Result<KeyRing> {
        let mut paths = Vec::new();
        for dirent in std::fs::read_dir(&self.dir).map_err(|e| self.io_error(e))? {
            let path = dirent.map_err(|e| self.io_error(e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "xml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut entries = Vec::new();
        let mut revocations = Vec::new();
        for path in paths {
            let xml = std::fs::read_to_string(&path).map_err(|source| AuditError::Io {
                path: path.clone(),
                source,
            })?;
            match parse_key_document(&xml) {
                Ok(KeyDocument::Key(entry)) => {
                    debug!(key_id = %entry.id, file = %path.display(), "Loaded key");
                    entries.push(entry);
                }
                Ok(KeyDocument::Revocation(revocation)) => revocations.push(revocation),
                // Revocations are never skipped
                Err(reason) if REVOCATION_ROOT.is_match(&xml) => {
                    return Err(AuditError::KeyRingXml { path, reason });
                }
                Err(reason) => warn!(file = %path.display(), %reason, "Skipping key file"),
            }
        }

        apply_revocations(&mut entries, &revocations);
        KeyRing::from_entries(entries)
    }
}
