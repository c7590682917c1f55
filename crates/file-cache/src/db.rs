//! SQLite-backed metadata store adapter.
//!
//! One [`CacheEntry`] row per remote path, keyed by a namespaced encoding of
//! the path. The adapter only ever gets, puts, or deletes whole records;
//! SQLite's single-key atomicity is what keeps concurrent read-modify-write
//! cycles from tearing a record.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Row,
};

use crate::error::Result;

/// Upper bound on stored validator tokens; longer tokens are truncated at
/// capture time.
pub const MAX_VALIDATOR_LEN: usize = 256;

/// Key namespace prefix distinguishing cache entries from any other record
/// types sharing the store.
const KEY_PREFIX: &str = "fc:";

/// Persisted metadata for one remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Local file holding the last known-good full content.
    pub local_filename: PathBuf,
    /// Opaque content-version token from the remote store; empty when the
    /// store never supplied one.
    pub validator: String,
    /// Unix seconds of the last time freshness was confirmed against the
    /// remote store.
    pub last_revalidated: i64,
}

impl CacheEntry {
    /// Whether this entry can be used without contacting the remote store.
    pub fn is_fresh(&self, window: Duration) -> bool {
        let now = chrono::Utc::now().timestamp();
        now - self.last_revalidated <= window.as_secs() as i64
    }
}

/// Truncate a validator token to the stored bound, on a char boundary.
pub(crate) fn clamp_validator(validator: &str) -> String {
    if validator.len() <= MAX_VALIDATOR_LEN {
        return validator.to_string();
    }
    let mut end = MAX_VALIDATOR_LEN;
    while !validator.is_char_boundary(end) {
        end -= 1;
    }
    validator[..end].to_string()
}

/// Deterministic store key for a remote path.
fn entry_key(path: &str) -> String {
    format!("{KEY_PREFIX}{path}")
}

/// SQLite connection pool holding the persisted cache entries.
#[derive(Debug, Clone)]
pub struct MetadataDb {
    pool: SqlitePool,
}

impl MetadataDb {
    /// Open (creating if missing) the metadata database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Create an in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Look up the entry for a remote path. Absence is not an error.
    pub async fn get(&self, path: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query(
            r#"
            SELECT local_filename, validator, last_revalidated
            FROM cache_entries
            WHERE key = ?
            "#,
        )
        .bind(entry_key(path))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CacheEntry {
            local_filename: PathBuf::from(r.get::<String, _>("local_filename")),
            validator: r.get("validator"),
            last_revalidated: r.get("last_revalidated"),
        }))
    }

    /// Persist the entry for a remote path (whole-record upsert,
    /// last-writer-wins).
    pub async fn put(&self, path: &str, entry: &CacheEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, local_filename, validator, last_revalidated)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                local_filename = excluded.local_filename,
                validator = excluded.validator,
                last_revalidated = excluded.last_revalidated
            "#,
        )
        .bind(entry_key(path))
        .bind(entry.local_filename.to_string_lossy().into_owned())
        .bind(&entry.validator)
        .bind(entry.last_revalidated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete the entry for a remote path. Returns whether a record existed.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM cache_entries WHERE key = ?
            "#,
        )
        .bind(entry_key(path))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
