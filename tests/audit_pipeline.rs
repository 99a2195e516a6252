//! End-to-end audits over a SQLite user table and on-disk key rings.

use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use key_audit::{
    config::AuditConfig,
    key_id::{KeyId, MIN_PAYLOAD_LEN},
    key_ring::KeyRingSource,
    payload::encode_protected_field,
    report::ReportFormat,
    runner::run_sqlite,
    AuditRow, FieldIssue, KeyStatus,
};
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

const ACTIVE: &str = "80732141-ec8f-4b80-af9c-c4d2d1ff8901";
const EXPIRED: &str = "eb4fc299-8808-409d-8a34-23fc83d026c9";
const REVOKED: &str = "1f2e3d4c-5b6a-4798-8a9b-0c1d2e3f4a5b";
const PENDING: &str = "00112233-4455-6677-8899-aabbccddeeff";
const UNKNOWN: &str = "deadbeef-0000-4000-8000-000000000000";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn id(s: &str) -> KeyId {
    s.parse().unwrap()
}

/// Header + key id + some ciphertext, as stored in the user table.
fn protected(key: &str) -> String {
    let mut payload = vec![0x09, 0xf0, 0xc9, 0xf0];
    payload.extend_from_slice(&id(key).to_guid_bytes());
    payload.extend((0..48u8).map(|b| b.wrapping_mul(37)));
    encode_protected_field(&payload)
}

fn seed_users(path: &Path, rows: &[(&str, Option<String>, Option<String>)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        r#"CREATE TABLE "User" ("Id" TEXT NOT NULL, "MasterPassword" TEXT, "Key" TEXT);"#,
    )
    .unwrap();
    for (user_id, master_password, key) in rows {
        conn.execute(
            r#"INSERT INTO "User" VALUES (?1, ?2, ?3)"#,
            params![user_id, master_password, key],
        )
        .unwrap();
    }
}

fn key_xml(
    key: &str,
    created: DateTime<Utc>,
    activation: DateTime<Utc>,
    expiration: DateTime<Utc>,
) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<key id="{key}" version="1">
  <creationDate>{}</creationDate>
  <activationDate>{}</activationDate>
  <expirationDate>{}</expirationDate>
  <descriptor><descriptor><masterKey><value>AAAA</value></masterKey></descriptor></descriptor>
</key>"#,
        created.to_rfc3339(),
        activation.to_rfc3339(),
        expiration.to_rfc3339()
    )
}

fn write_key_dir(dir: &Path) {
    let n = now();
    let keys = [
        (ACTIVE, n - Duration::days(10), n + Duration::days(80)),
        (EXPIRED, n - Duration::days(200), n - Duration::days(110)),
        (REVOKED, n - Duration::days(5), n + Duration::days(85)),
        (PENDING, n + Duration::days(2), n + Duration::days(92)),
    ];
    for (key, activation, expiration) in keys {
        std::fs::write(
            dir.join(format!("key-{key}.xml")),
            key_xml(key, activation - Duration::days(2), activation, expiration),
        )
        .unwrap();
    }
    std::fs::write(
        dir.join("revocation-1.xml"),
        format!(
            r#"<revocation version="1">
  <revocationDate>{}</revocationDate>
  <key id="{REVOKED}" />
  <reason>compromised host</reason>
</revocation>"#,
            (n - Duration::days(1)).to_rfc3339()
        ),
    )
    .unwrap();
}

fn write_key_ring_json(path: &Path) {
    let n = now();
    let ring = json!([
        { "id": ACTIVE, "activation": n - Duration::days(10), "expiration": n + Duration::days(10) },
        { "id": EXPIRED, "activation": n - Duration::days(30), "expiration": n - Duration::days(1) },
        { "id": REVOKED, "activation": n - Duration::days(10), "expiration": n + Duration::days(10), "revoked": true },
        { "id": PENDING, "activation": n + Duration::days(1), "expiration": n + Duration::days(90) },
    ]);
    std::fs::write(path, serde_json::to_vec_pretty(&ring).unwrap()).unwrap();
}

struct Fixture {
    _dir: TempDir,
    config: AuditConfig,
}

fn fixture(key_ring: impl FnOnce(&Path) -> KeyRingSource) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("vault.db");
    seed_users(
        &db,
        &[
            ("user-1", Some(protected(ACTIVE)), Some(protected(EXPIRED))),
            ("user-2", Some(protected(REVOKED)), Some(protected(PENDING))),
            ("user-3", Some(protected(UNKNOWN)), None),
            ("user-4", Some("legacy-pbkdf2-hash".into()), Some(String::new())),
            (
                "user-5",
                Some("P|%%%".into()),
                Some(encode_protected_field(&[1u8; MIN_PAYLOAD_LEN - 1])),
            ),
        ],
    );
    let key_ring = key_ring(dir.path());
    Fixture {
        config: AuditConfig {
            database: db,
            key_ring,
            as_of: Some(now()),
            ..AuditConfig::default()
        },
        _dir: dir,
    }
}

async fn audit(config: &AuditConfig) -> (Vec<AuditRow>, String) {
    let mut out = Vec::<u8>::new();
    let rows = run_sqlite(config, &mut out, &mut std::io::sink())
        .await
        .expect("audit run");
    (rows, String::from_utf8(out).unwrap())
}

// ============================================================================
// Key directory
// ============================================================================

#[tokio::test]
async fn classifies_against_key_directory() {
    let fx = fixture(|dir| {
        let keys = dir.join("keys");
        std::fs::create_dir(&keys).unwrap();
        write_key_dir(&keys);
        KeyRingSource::Directory(keys)
    });
    let (rows, _) = audit(&fx.config).await;

    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].master_password.key_id, Some(id(ACTIVE)));
    assert_eq!(rows[0].master_password.status, Some(KeyStatus::Active));
    assert_eq!(rows[0].key.status, Some(KeyStatus::Expired));
    assert_eq!(rows[1].master_password.status, Some(KeyStatus::Revoked));
    assert_eq!(rows[1].key.status, Some(KeyStatus::Created));
    assert_eq!(rows[2].master_password.key_id, Some(id(UNKNOWN)));
    assert_eq!(rows[2].master_password.status, Some(KeyStatus::NotFound));
    assert_eq!(rows[2].key.key_id, None);
}

#[tokio::test]
async fn failures_are_isolated_per_field() {
    let fx = fixture(|dir| {
        write_key_dir(dir);
        KeyRingSource::Directory(dir.to_path_buf())
    });
    let (rows, _) = audit(&fx.config).await;

    let legacy = &rows[3];
    assert_eq!(legacy.record_id, "user-4");
    assert_eq!(legacy.master_password.key_id, None);
    assert_eq!(legacy.master_password.issue, None);
    assert_eq!(legacy.key.key_id, None);

    let broken = &rows[4];
    assert_eq!(broken.master_password.issue, Some(FieldIssue::Malformed));
    assert_eq!(broken.key.issue, Some(FieldIssue::TooShort));
    assert_eq!(broken.master_password.status, None);
    assert_eq!(broken.key.status, None);
}

// ============================================================================
// JSON snapshot and report formats
// ============================================================================

#[tokio::test]
async fn csv_report_against_json_snapshot() {
    let fx = fixture(|dir| {
        let path = dir.join("ring.json");
        write_key_ring_json(&path);
        KeyRingSource::Json(path)
    });
    let (_, csv) = audit(&fx.config).await;
    let lines: Vec<_> = csv.lines().collect();

    assert_eq!(
        lines,
        vec![
            "Id,MasterPasswordKeyId,MasterPasswordKeyStatus,KeyId,KeyStatus".to_string(),
            format!("user-1,{ACTIVE},Active,{EXPIRED},Expired"),
            format!("user-2,{REVOKED},Revoked,{PENDING},Created"),
            format!("user-3,{UNKNOWN},NotFound,,"),
            "user-4,,,,".to_string(),
            "user-5,,,,".to_string(),
        ]
    );
}

#[tokio::test]
async fn json_report_without_key_ring() {
    let mut fx = fixture(|_| KeyRingSource::None);
    fx.config.format = ReportFormat::Json;
    let (rows, text) = audit(&fx.config).await;

    // Key ids still come through; statuses are unknown rather than NotFound
    for row in &rows {
        assert_eq!(row.master_password.status, None);
        assert_eq!(row.key.status, None);
    }
    let first: Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(
        first,
        json!({
            "id": "user-1",
            "masterPasswordKeyId": ACTIVE,
            "masterPasswordKeyStatus": null,
            "keyId": EXPIRED,
            "keyStatus": null,
        })
    );
}

// ============================================================================
// Concurrency and time
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn workers_do_not_change_output() {
    let mut fx = fixture(|dir| {
        let path = dir.join("ring.json");
        write_key_ring_json(&path);
        KeyRingSource::Json(path)
    });
    let (_, sequential) = audit(&fx.config).await;
    fx.config.workers = 3;
    let (_, concurrent) = audit(&fx.config).await;
    assert_eq!(sequential, concurrent);
}

#[tokio::test]
async fn as_of_moves_lifecycle() {
    let mut fx = fixture(|dir| {
        let path = dir.join("ring.json");
        write_key_ring_json(&path);
        KeyRingSource::Json(path)
    });
    fx.config.as_of = Some(now() + Duration::days(30));
    let (rows, _) = audit(&fx.config).await;
    assert_eq!(rows[0].master_password.status, Some(KeyStatus::Expired));
    assert_eq!(rows[1].master_password.status, Some(KeyStatus::Revoked));
    assert_eq!(rows[1].key.status, Some(KeyStatus::Active));
}
