//! Persistence of identity records and the access log
//!
//! [`SqliteStore`] keeps identities keyed by natural key (unique) and by
//! anonymized id (unique secondary key), plus an append-only access log.
//! All statements go through one connection behind a mutex and run on
//! tokio's blocking pool. Upserts run in a transaction so re-registrations
//! of the same identity never interleave.

use crate::crypto::EncryptedBlob;
use crate::error::{AnonIdError, Result};
use crate::privacy::RiskTier;
use crate::types::{AccessLogEntry, FieldMap, StoreStats, StoredIdentity};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Storage backend for identities and their access trail
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up an identity by natural key
    async fn get_by_natural_key(&self, natural_key: &str) -> Result<Option<StoredIdentity>>;

    /// Look up an identity by anonymized id
    async fn get_by_anonymized_id(&self, anonymized_id: &str) -> Result<Option<StoredIdentity>>;

    /// Insert or wholesale replace the identity for its natural key
    async fn upsert(&self, identity: &StoredIdentity) -> Result<()>;

    /// Append one access attempt to the audit trail
    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<()>;

    /// Access attempts for a natural key, oldest first
    async fn access_log(&self, natural_key: &str) -> Result<Vec<AccessLogEntry>>;

    /// Aggregate counters
    async fn stats(&self) -> Result<StoreStats>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS identities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nin TEXT UNIQUE NOT NULL,
        anon_id TEXT UNIQUE NOT NULL,
        public_profile TEXT NOT NULL,
        encrypted_sensitive TEXT NOT NULL,
        salt TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS access_logs (
        id TEXT PRIMARY KEY,
        nin TEXT NOT NULL,
        endpoint TEXT NOT NULL,
        requested_fields TEXT NOT NULL,
        access_granted INTEGER NOT NULL,
        risk_level TEXT,
        risk_score INTEGER,
        timestamp INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_access_logs_nin ON access_logs(nin);
";

const IDENTITY_COLUMNS: &str =
    "nin, anon_id, public_profile, encrypted_sensitive, salt, created_at, updated_at";

/// Raw identity row before JSON/base64 decoding
struct IdentityRow {
    nin: String,
    anon_id: String,
    public_profile: String,
    encrypted_sensitive: String,
    salt: String,
    created_at: i64,
    updated_at: i64,
}

impl IdentityRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            nin: row.get(0)?,
            anon_id: row.get(1)?,
            public_profile: row.get(2)?,
            encrypted_sensitive: row.get(3)?,
            salt: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<StoredIdentity> {
        let public_fields: FieldMap = serde_json::from_str(&self.public_profile)?;
        let blob: EncryptedBlob = serde_json::from_str(&self.encrypted_sensitive)?;
        let salt = BASE64.decode(&self.salt).map_err(|e| {
            AnonIdError::Decryption(format!("Invalid salt encoding: {}", e))
        })?;
        Ok(StoredIdentity {
            natural_key: self.nin,
            anonymized_id: self.anon_id,
            public_fields,
            blob,
            salt,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SQLite-backed identity store
///
/// rusqlite is synchronous, so every call hops onto tokio's blocking pool
/// and the async workers never wait on disk I/O.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AnonIdError::Config(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "Opened identity database");
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|e| {
                AnonIdError::Internal(format!("Failed to acquire database lock: {}", e))
            })?;
            f(&mut guard)
        })
        .await
        .map_err(|e| AnonIdError::Internal(format!("Database task failed: {}", e)))?
    }

    async fn get_by(&self, column: &'static str, value: &str) -> Result<Option<StoredIdentity>> {
        let value = value.to_string();
        let row = self
            .blocking(move |conn| {
                let sql = format!(
                    "SELECT {} FROM identities WHERE {} = ?1",
                    IDENTITY_COLUMNS, column
                );
                Ok(conn
                    .query_row(&sql, params![value], IdentityRow::from_row)
                    .optional()?)
            })
            .await?;
        row.map(IdentityRow::decode).transpose()
    }

    fn count(conn: &Connection, sql: &str) -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn get_by_natural_key(&self, natural_key: &str) -> Result<Option<StoredIdentity>> {
        self.get_by("nin", natural_key).await
    }

    async fn get_by_anonymized_id(&self, anonymized_id: &str) -> Result<Option<StoredIdentity>> {
        self.get_by("anon_id", anonymized_id).await
    }

    async fn upsert(&self, identity: &StoredIdentity) -> Result<()> {
        let public_profile = serde_json::to_string(&identity.public_fields)?;
        let encrypted = serde_json::to_string(&identity.blob)?;
        let salt = BASE64.encode(&identity.salt);
        let nin = identity.natural_key.clone();
        let anon_id = identity.anonymized_id.clone();
        let (created_at, updated_at) = (identity.created_at, identity.updated_at);

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO identities
                    (nin, anon_id, public_profile, encrypted_sensitive, salt, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(nin) DO UPDATE SET
                    anon_id = excluded.anon_id,
                    public_profile = excluded.public_profile,
                    encrypted_sensitive = excluded.encrypted_sensitive,
                    salt = excluded.salt,
                    updated_at = excluded.updated_at",
                params![nin, anon_id, public_profile, encrypted, salt, created_at, updated_at],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        tracing::debug!(anon_id = %identity.anonymized_id, "Identity upserted");
        Ok(())
    }

    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<()> {
        let fields = serde_json::to_string(&entry.requested_fields)?;
        let entry = entry.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO access_logs
                    (id, nin, endpoint, requested_fields, access_granted, risk_level, risk_score, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.id,
                    entry.natural_key_ref,
                    entry.endpoint,
                    fields,
                    entry.granted,
                    entry.tier.map(|t| t.to_string()),
                    entry.score,
                    entry.timestamp,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn access_log(&self, natural_key: &str) -> Result<Vec<AccessLogEntry>> {
        let natural_key = natural_key.to_string();
        let rows = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, nin, endpoint, requested_fields, access_granted, risk_level, risk_score, timestamp
                     FROM access_logs WHERE nin = ?1 ORDER BY timestamp ASC, rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![natural_key], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, bool>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, Option<u8>>(6)?,
                            row.get::<_, i64>(7)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(
                |(id, nin, endpoint, fields, granted, tier, score, timestamp)| {
                    Ok(AccessLogEntry {
                        id,
                        natural_key_ref: nin,
                        endpoint,
                        requested_fields: serde_json::from_str(&fields)?,
                        granted,
                        tier: tier.as_deref().and_then(RiskTier::parse),
                        score,
                        timestamp,
                    })
                },
            )
            .collect()
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.blocking(|conn| {
            Ok(StoreStats {
                total_users: Self::count(conn, "SELECT COUNT(*) FROM identities")?,
                total_accesses: Self::count(conn, "SELECT COUNT(*) FROM access_logs")?,
                access_granted: Self::count(
                    conn,
                    "SELECT COUNT(*) FROM access_logs WHERE access_granted = 1",
                )?,
                access_denied: Self::count(
                    conn,
                    "SELECT COUNT(*) FROM access_logs WHERE access_granted = 0",
                )?,
            })
        })
        .await
    }
}
