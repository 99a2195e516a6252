//! Key status classification.

use chrono::{DateTime, Utc};

use super::types::{KeyRing, KeyStatus};
use crate::key_id::KeyId;

/// Classify `id` against the snapshot as of `now`.
///
/// Revocation wins over any dates. Otherwise a key is `Created` up to and
/// including its activation instant, `Expired` strictly after its expiration
/// instant, and `Active` in between. Nothing is cached; the same inputs
/// always give the same status.
pub fn resolve(ring: &KeyRing, id: &KeyId, now: DateTime<Utc>) -> KeyStatus {
    let entry = match ring.get(id) {
        Some(entry) => entry,
        None => return KeyStatus::NotFound,
    };

    if entry.revoked {
        KeyStatus::Revoked
    } else if now <= entry.activation {
        KeyStatus::Created
    } else if now > entry.expiration {
        KeyStatus::Expired
    } else {
        KeyStatus::Active
    }
}
