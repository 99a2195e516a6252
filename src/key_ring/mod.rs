//! Key ring snapshot: known keys, their lifecycle, and how they are loaded.

pub mod directory;
pub mod json;
pub mod resolve;
pub mod types;

use std::path::PathBuf;

use tracing::info;

use crate::error::Result;

pub use directory::KeyDirectoryLoader;
pub use json::JsonKeyRingLoader;
pub use resolve::resolve;
pub use types::{KeyRing, KeyRingEntry, KeyStatus};

/// Produces a key ring snapshot once, before auditing starts.
pub trait KeyRingLoader {
    fn load(&self) -> Result<KeyRing>;
}

/// Where the key ring comes from, if anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyRingSource {
    /// No snapshot; key statuses are left unresolved.
    #[default]
    None,
    Json(PathBuf),
    Directory(PathBuf),
}

/// Load the snapshot for `source`. `Ok(None)` means none was requested.
pub fn load_key_ring(source: &KeyRingSource) -> Result<Option<KeyRing>> {
    let ring = match source {
        KeyRingSource::None => return Ok(None),
        KeyRingSource::Json(path) => JsonKeyRingLoader::new(path).load()?,
        KeyRingSource::Directory(dir) => KeyDirectoryLoader::new(dir).load()?,
    };
    info!(keys = ring.len(), "Loaded key ring");
    Ok(Some(ring))
}
