//! SQLite-backed verdict history. The client identifier column is AES-GCM encrypted;
//! the key is derived from a caller-supplied secret.

use crate::decision::{AssessmentContext, Verdict, VerdictReason, VerdictSink};
use crate::error::{Error, Result};
use crate::features::FeatureVector;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out.copy_from_slice(h.as_ref());
    out
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| Error::Crypto(e.to_string()))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), plaintext)
        .map_err(|e| Error::Crypto(e.to_string()))?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| Error::Crypto(e.to_string()))?;
    if raw.len() < NONCE_LEN {
        return Err(Error::Crypto("payload too short".into()));
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| Error::Crypto(e.to_string()))?;
    cipher
        .decrypt(nonce.into(), ct)
        .map_err(|e| Error::Crypto(e.to_string()))
}

/// One row of `url_checks`, client id decrypted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCheck {
    pub id: Uuid,
    pub url: String,
    pub checked_at: DateTime<Utc>,
    pub is_malicious: bool,
    pub confidence: f64,
    pub reason: VerdictReason,
    pub features: FeatureVector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub status_message: String,
}

pub struct VerdictStore {
    conn: Mutex<Connection>,
    key: [u8; KEY_LEN],
}

impl VerdictStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path, secret: &[u8]) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Self::with_connection(Connection::open(path)?, secret)
    }

    pub fn open_in_memory(secret: &[u8]) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, secret)
    }

    fn with_connection(conn: Connection, secret: &[u8]) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS url_checks (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                check_ts INTEGER NOT NULL,
                is_malicious INTEGER NOT NULL,
                confidence REAL NOT NULL,
                reason TEXT NOT NULL,
                features TEXT NOT NULL,
                client_enc TEXT,
                status_message TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_url_checks_ts ON url_checks(check_ts);
            CREATE INDEX IF NOT EXISTS idx_url_checks_url ON url_checks(url);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: derive_key(secret),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert(&self, verdict: &Verdict, context: &AssessmentContext) -> Result<()> {
        let features = serde_json::to_string(&verdict.features)?;
        let client_enc = context
            .client_id
            .as_deref()
            .map(|c| encrypt(&self.key, c.as_bytes()))
            .transpose()?;
        self.conn().execute(
            "INSERT OR REPLACE INTO url_checks \
             (id, url, check_ts, is_malicious, confidence, reason, features, client_enc, status_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                verdict.id.to_string(),
                verdict.url,
                verdict.assessed_at.timestamp_millis(),
                verdict.is_malicious,
                verdict.confidence,
                verdict.reason.as_str(),
                features,
                client_enc,
                context.status_for(verdict),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<StoredCheck>> {
        let raw = self
            .conn()
            .query_row(
                "SELECT id, url, check_ts, is_malicious, confidence, reason, features, client_enc, status_message \
                 FROM url_checks WHERE id = ?1",
                params![id.to_string()],
                RawRow::from_row,
            )
            .optional()?;
        raw.map(|r| r.decode(&self.key)).transpose()
    }

    /// Newest first.
    pub fn recent_checks(&self, limit: usize) -> Result<Vec<StoredCheck>> {
        let rows = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT id, url, check_ts, is_malicious, confidence, reason, features, client_enc, status_message \
                 FROM url_checks ORDER BY check_ts DESC, rowid DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit as i64], RawRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(|r| r.decode(&self.key)).collect()
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM url_checks", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Retention: delete checks older than `before`.
    pub fn prune_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let n = self.conn().execute(
            "DELETE FROM url_checks WHERE check_ts < ?1",
            params![before.timestamp_millis()],
        )?;
        Ok(n as u64)
    }
}

impl VerdictSink for VerdictStore {
    fn record(&self, verdict: &Verdict, context: &AssessmentContext) -> Result<()> {
        self.insert(verdict, context)
    }
}

struct RawRow {
    id: String,
    url: String,
    check_ts: i64,
    is_malicious: bool,
    confidence: f64,
    reason: String,
    features: String,
    client_enc: Option<String>,
    status_message: Option<String>,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            check_ts: row.get(2)?,
            is_malicious: row.get(3)?,
            confidence: row.get(4)?,
            reason: row.get(5)?,
            features: row.get(6)?,
            client_enc: row.get(7)?,
            status_message: row.get(8)?,
        })
    }

    fn decode(self, key: &[u8; KEY_LEN]) -> Result<StoredCheck> {
        let client_id = match self.client_enc {
            Some(enc) => Some(
                String::from_utf8(decrypt(key, &enc)?)
                    .map_err(|e| Error::CorruptRecord(format!("client id: {}", e)))?,
            ),
            None => None,
        };
        Ok(StoredCheck {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| Error::CorruptRecord(format!("id {:?}: {}", self.id, e)))?,
            url: self.url,
            checked_at: Utc
                .timestamp_millis_opt(self.check_ts)
                .single()
                .unwrap_or_default(),
            is_malicious: self.is_malicious,
            confidence: self.confidence,
            reason: self.reason.parse().map_err(Error::CorruptRecord)?,
            features: serde_json::from_str(&self.features)?,
            client_id,
            status_message: self.status_message.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SentinelConfig;
    use crate::decision::DecisionEngine;
    use crate::features::Lexicon;
    use crate::model::ModelSlot;
    use chrono::Duration;
    use std::sync::Arc;

    fn engine() -> DecisionEngine {
        DecisionEngine::from_config(
            &SentinelConfig::default(),
            Arc::new(Lexicon::default()),
            Arc::new(ModelSlot::empty()),
        )
    }

    #[test]
    fn roundtrip_with_encrypted_client() {
        let dir = tempfile::tempdir().unwrap();
        let store = VerdictStore::open(&dir.path().join("db").join("checks.db"), b"secret").unwrap();
        let v = engine().assess("http://bit.ly/abc123");
        store.insert(&v, &AssessmentContext::for_client("192.168.1.7")).unwrap();

        let back = store.get(&v.id).unwrap().unwrap();
        assert_eq!(back.url, v.url);
        assert_eq!(back.reason, VerdictReason::Heuristic);
        assert_eq!(back.features, v.features);
        assert_eq!(back.client_id.as_deref(), Some("192.168.1.7"));
        assert_eq!(back.status_message, "Suspicious patterns detected");

        let raw: String = store
            .conn()
            .query_row("SELECT client_enc FROM url_checks", [], |r| r.get(0))
            .unwrap();
        assert!(!raw.contains("192.168"));
    }

    #[test]
    fn wrong_secret_cannot_read_client() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checks.db");
        let v = engine().assess("https://github.com");
        VerdictStore::open(&path, b"one")
            .unwrap()
            .insert(&v, &AssessmentContext::for_client("c1"))
            .unwrap();
        let other = VerdictStore::open(&path, b"two").unwrap();
        assert!(matches!(other.get(&v.id), Err(Error::Crypto(_))));
    }

    #[test]
    fn recent_is_newest_first_and_prune_works() {
        let store = VerdictStore::open_in_memory(b"k").unwrap();
        let e = engine();
        let mut old = e.assess("https://example.org/a");
        old.assessed_at = Utc::now() - Duration::days(40);
        let new = e.assess("https://example.org/b");
        store.insert(&old, &AssessmentContext::default()).unwrap();
        store.insert(&new, &AssessmentContext::default()).unwrap();

        let recent = store.recent_checks(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].url, "https://example.org/b");
        assert_eq!(recent[0].client_id, None);
        assert_eq!(store.recent_checks(1).unwrap().len(), 1);

        assert_eq!(store.prune_before(Utc::now() - Duration::days(30)).unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn engine_records_through_sink() {
        let store = Arc::new(VerdictStore::open_in_memory(b"k").unwrap());
        let e = engine().with_sink(store.clone());
        e.assess("https://wikipedia.org/wiki/Rust");
        e.assess("http://g00gle.com/admin/login.php");
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn unparseable_columns_are_corrupt_records() {
        let store = VerdictStore::open_in_memory(b"k").unwrap();
        let v = engine().assess("https://example.org/a");
        store.insert(&v, &AssessmentContext::for_client("10.0.0.1")).unwrap();

        store
            .conn()
            .execute("UPDATE url_checks SET reason = 'quarantined'", [])
            .unwrap();
        assert!(matches!(store.get(&v.id), Err(Error::CorruptRecord(_))));

        store
            .conn()
            .execute("UPDATE url_checks SET reason = 'model', id = 'not-a-uuid'", [])
            .unwrap();
        match store.recent_checks(10) {
            Err(Error::CorruptRecord(msg)) => assert!(msg.contains("not-a-uuid")),
            other => panic!("expected CorruptRecord, got {:?}", other),
        }
    }
}
