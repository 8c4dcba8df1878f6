//! SQLite implementation of ObjectCache
//!
//! One database file holds one collection (`objects`) of binary payloads keyed by
//! dataset file name. Entries survive process restarts.
//!
//! The schema is versioned through `PRAGMA user_version`. Each upgrade step runs
//! exactly once per database file, inside an immediate transaction, and never drops
//! entries for keys that remain valid.

use crate::{default_timestamp, CacheKey, ObjectCache, ObjectCacheError, ObjectCacheResult};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Ordered schema upgrades: (version, description, statements)
const MIGRATIONS: &[(i64, &str, &[&str])] = &[
    (
        1,
        "create objects collection",
        &["CREATE TABLE IF NOT EXISTS objects (
            key TEXT PRIMARY KEY NOT NULL,
            payload BLOB NOT NULL
        )"],
    ),
    (
        2,
        "track payload size and store time",
        &[
            "ALTER TABLE objects ADD COLUMN byte_len INTEGER NOT NULL DEFAULT 0",
            "ALTER TABLE objects ADD COLUMN stored_at INTEGER NOT NULL DEFAULT 0",
            "UPDATE objects SET byte_len = length(payload)",
        ],
    ),
];

/// Schema version this build writes
pub const SCHEMA_VERSION: i64 = 2;

/// Metadata about a stored payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryInfo {
    pub key: CacheKey,
    pub byte_len: u64,
    /// Unix timestamp in milliseconds
    pub stored_at: u64,
}

/// Connection tuning for the SQLite backend
#[derive(Debug, Clone)]
pub struct SqliteCacheOptions {
    pub max_connections: u32,
    pub busy_timeout: Duration,
    /// Payloads larger than this are rejected with `QuotaExceeded`
    pub max_payload_bytes: Option<usize>,
}

impl Default for SqliteCacheOptions {
    fn default() -> Self {
        Self {
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            max_payload_bytes: None,
        }
    }
}

#[derive(Debug)]
struct OpenedStore {
    pool: SqlitePool,
    applied: Vec<i64>,
}

/// Persistent object cache backed by a single SQLite file.
///
/// Construction is cheap; the database is opened lazily by [`SqliteObjectCache::open`],
/// which every operation awaits. Concurrent callers share a single in-flight
/// initialisation.
#[derive(Debug)]
pub struct SqliteObjectCache {
    path: PathBuf,
    options: SqliteCacheOptions,
    opened: OnceCell<OpenedStore>,
}

impl SqliteObjectCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, SqliteCacheOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: SqliteCacheOptions) -> Self {
        Self {
            path: path.into(),
            options,
            opened: OnceCell::new(),
        }
    }

    /// Location of the backing database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the backing store, creating the file and collection if absent.
    ///
    /// Idempotent: the first call performs initialisation, every later or concurrent
    /// call observes the same ready pool. A failed initialisation is not memoised,
    /// so the next call retries.
    pub async fn open(&self) -> ObjectCacheResult<&SqlitePool> {
        let opened = self
            .opened
            .get_or_try_init(|| async { self.initialise().await })
            .await?;
        Ok(&opened.pool)
    }

    /// Schema versions applied by this handle's initialisation (empty when the
    /// file was already current, or before `open` has completed)
    pub fn applied_upgrades(&self) -> Vec<i64> {
        self.opened
            .get()
            .map(|opened| opened.applied.clone())
            .unwrap_or_default()
    }

    /// Metadata for every stored entry, ordered by key
    pub async fn entries(&self) -> ObjectCacheResult<Vec<CacheEntryInfo>> {
        let pool = self.open().await?;
        let rows: Vec<(String, i64, i64)> =
            sqlx::query_as("SELECT key, byte_len, stored_at FROM objects ORDER BY key")
                .fetch_all(pool)
                .await?;

        rows.into_iter()
            .map(|(key, byte_len, stored_at)| {
                Ok(CacheEntryInfo {
                    key: CacheKey::new(key)?,
                    byte_len: byte_len.max(0) as u64,
                    stored_at: stored_at.max(0) as u64,
                })
            })
            .collect()
    }

    async fn initialise(&self) -> ObjectCacheResult<OpenedStore> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ObjectCacheError::StoreFailure(format!(
                        "Failed to create cache directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(self.options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(self.options.max_connections)
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                ObjectCacheError::StoreFailure(format!(
                    "Failed to open object cache at {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        let applied = Self::upgrade(&pool).await?;
        info!(path = %self.path.display(), applied = ?applied, "Object cache ready");

        Ok(OpenedStore { pool, applied })
    }

    async fn upgrade(pool: &SqlitePool) -> ObjectCacheResult<Vec<i64>> {
        let mut conn = pool.acquire().await?;

        // IMMEDIATE takes the write lock up front so two processes cannot both
        // observe the old version and apply the same step.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = async {
            let current: i64 = sqlx::query_scalar("PRAGMA user_version")
                .fetch_one(&mut *conn)
                .await?;

            if current > SCHEMA_VERSION {
                warn!(
                    current,
                    known = SCHEMA_VERSION,
                    "Object cache schema is newer than this build; using it as is"
                );
            }

            let mut applied = Vec::new();
            for (version, description, statements) in MIGRATIONS {
                if *version <= current {
                    continue;
                }
                debug!(version, description, "Applying object cache schema upgrade");
                for statement in statements.iter() {
                    sqlx::query(*statement).execute(&mut *conn).await?;
                }
                applied.push(*version);
            }

            if let Some(latest) = applied.last() {
                let pragma = format!("PRAGMA user_version = {}", latest);
                sqlx::query(&pragma).execute(&mut *conn).await?;
            }

            Ok::<_, sqlx::Error>(applied)
        }
        .await;

        match result {
            Ok(applied) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(applied)
            }
            Err(e) => {
                if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    warn!(error = %rollback, "Rollback of failed schema upgrade failed");
                }
                Err(ObjectCacheError::StoreFailure(format!(
                    "Object cache schema upgrade failed: {}",
                    e
                )))
            }
        }
    }
}

#[async_trait]
impl ObjectCache for SqliteObjectCache {
    async fn put(&self, key: &CacheKey, payload: &[u8]) -> ObjectCacheResult<()> {
        if let Some(limit) = self.options.max_payload_bytes {
            if payload.len() > limit {
                return Err(ObjectCacheError::QuotaExceeded {
                    key: key.clone(),
                    size: payload.len(),
                    limit,
                });
            }
        }

        let pool = self.open().await?;
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO objects (key, payload, byte_len, stored_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                byte_len = excluded.byte_len,
                stored_at = excluded.stored_at",
        )
        .bind(key.as_str())
        .bind(payload)
        .bind(payload.len() as i64)
        .bind(default_timestamp() as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(key = %key, bytes = payload.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> ObjectCacheResult<Vec<u8>> {
        let pool = self.open().await?;
        let payload: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT payload FROM objects WHERE key = ?1")
                .bind(key.as_str())
                .fetch_optional(pool)
                .await?;

        payload.ok_or_else(|| ObjectCacheError::NotFound(key.clone()))
    }

    async fn contains(&self, key: &CacheKey) -> ObjectCacheResult<bool> {
        let pool = self.open().await?;
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM objects WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(pool)
            .await?;
        Ok(found.is_some())
    }

    async fn delete(&self, key: &CacheKey) -> ObjectCacheResult<()> {
        let pool = self.open().await?;
        sqlx::query("DELETE FROM objects WHERE key = ?1")
            .bind(key.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    async fn list_keys(&self) -> ObjectCacheResult<Vec<CacheKey>> {
        let pool = self.open().await?;
        let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM objects ORDER BY key")
            .fetch_all(pool)
            .await?;
        keys.into_iter().map(CacheKey::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use tempfile::TempDir;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name).unwrap()
    }

    fn cache_in(dir: &TempDir) -> SqliteObjectCache {
        SqliteObjectCache::new(dir.path().join("objects.db"))
    }

    #[tokio::test]
    async fn test_concurrent_open_initialises_once() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        let pools = join_all((0..8).map(|_| cache.open())).await;

        let first = pools[0].as_ref().unwrap();
        for pool in &pools {
            assert!(std::ptr::eq(*pool.as_ref().unwrap(), *first));
        }
        assert_eq!(cache.applied_upgrades(), vec![1, 2]);

        // Opening again is a no-op
        cache.open().await.unwrap();
        assert_eq!(cache.applied_upgrades(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let payload = vec![7u8; 4096];

        {
            let cache = cache_in(&dir);
            cache.put(&key("d.parquet"), &payload).await.unwrap();
        }

        let reopened = cache_in(&dir);
        assert_eq!(reopened.get(&key("d.parquet")).await.unwrap(), payload);
        // Schema was already current, nothing to apply
        assert!(reopened.applied_upgrades().is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_from_version_one_keeps_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("objects.db");

        {
            let options = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await
                .unwrap();
            sqlx::query("CREATE TABLE objects (key TEXT PRIMARY KEY NOT NULL, payload BLOB NOT NULL)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO objects (key, payload) VALUES ('old.parquet', x'0102030405')")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("PRAGMA user_version = 1").execute(&pool).await.unwrap();
            pool.close().await;
        }

        let cache = SqliteObjectCache::new(&path);
        assert_eq!(cache.get(&key("old.parquet")).await.unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(cache.applied_upgrades(), vec![2]);

        let entries = cache.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].byte_len, 5);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        let result = cache.get(&key("missing.parquet")).await;
        assert!(matches!(result, Err(ObjectCacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.put(&key("d.parquet"), b"first").await.unwrap();
        cache.put(&key("d.parquet"), b"second payload").await.unwrap();

        assert_eq!(cache.get(&key("d.parquet")).await.unwrap(), b"second payload");
        let entries = cache.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].byte_len, 14);
        assert!(entries[0].stored_at > 0);
    }

    #[tokio::test]
    async fn test_oversized_put_is_rejected_and_prior_value_kept() {
        let dir = TempDir::new().unwrap();
        let options = SqliteCacheOptions {
            max_payload_bytes: Some(16),
            ..SqliteCacheOptions::default()
        };
        let cache = SqliteObjectCache::with_options(dir.path().join("objects.db"), options);

        cache.put(&key("d.parquet"), b"small").await.unwrap();
        let result = cache.put(&key("d.parquet"), &[0u8; 32]).await;

        assert!(matches!(result, Err(ObjectCacheError::QuotaExceeded { .. })));
        assert_eq!(cache.get(&key("d.parquet")).await.unwrap(), b"small");
    }

    #[tokio::test]
    async fn test_delete_contains_and_list() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.put(&key("b.parquet"), b"b").await.unwrap();
        cache.put(&key("a.parquet"), b"a").await.unwrap();
        assert_eq!(
            cache.list_keys().await.unwrap(),
            vec![key("a.parquet"), key("b.parquet")]
        );

        cache.delete(&key("a.parquet")).await.unwrap();
        assert!(!cache.contains(&key("a.parquet")).await.unwrap());
        assert!(cache.contains(&key("b.parquet")).await.unwrap());
    }
}
