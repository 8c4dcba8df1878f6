//! QueryLens Object Cache
//!
//! Provides abstractions and implementations for keyed storage of large binary
//! payloads, typically dataset files. The ObjectCache trait defines a contract for
//! storing/retrieving whole payloads by key; a payload is either stored completely
//! or the operation fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::time::SystemTime;
use thiserror::Error;

/// Identifies a cached binary asset, typically a dataset file name such as
/// `imdb01-11-2024.parquet`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    /// Constructor ensures the key can double as a relative URL path segment
    pub fn new(key: impl Into<String>) -> Result<Self, ObjectCacheError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ObjectCacheError::InvalidKey("key must not be empty".to_string()));
        }
        if key.contains('/') || key.contains('\\') || key == "." || key == ".." {
            return Err(ObjectCacheError::InvalidKey(format!(
                "key must be a plain file name: {}",
                key
            )));
        }
        Ok(Self(key))
    }

    /// Get the string representation of the key
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = ObjectCacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Unix timestamp in milliseconds, used for `stored_at` bookkeeping
#[inline]
pub fn default_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Errors that can occur during object cache operations
#[derive(Error, Debug)]
pub enum ObjectCacheError {
    /// Expected outcome for a key that was never stored
    #[error("Object not found for key: {0}")]
    NotFound(CacheKey),

    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Quota exceeded storing {key}: {size} bytes would exceed limit of {limit} bytes")]
    QuotaExceeded {
        key: CacheKey,
        size: usize,
        limit: usize,
    },

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

impl ObjectCacheError {
    /// Absence is a normal outcome; callers branch on it rather than fail.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectCacheError::NotFound(_))
    }
}

impl From<sqlx::Error> for ObjectCacheError {
    fn from(err: sqlx::Error) -> Self {
        ObjectCacheError::StoreFailure(err.to_string())
    }
}

/// Result type for ObjectCache operations
pub type ObjectCacheResult<T> = Result<T, ObjectCacheError>;

/// Trait defining the contract for object cache implementations
#[async_trait]
pub trait ObjectCache: Send + Sync + Debug {
    /// Store a payload under `key`, replacing any prior value. A failed put
    /// leaves the previous value untouched.
    async fn put(&self, key: &CacheKey, payload: &[u8]) -> ObjectCacheResult<()>;

    /// Retrieve the payload stored under `key`, or `NotFound`
    async fn get(&self, key: &CacheKey) -> ObjectCacheResult<Vec<u8>>;

    /// Check if a payload exists for `key`
    async fn contains(&self, key: &CacheKey) -> ObjectCacheResult<bool>;

    /// Delete the payload stored under `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &CacheKey) -> ObjectCacheResult<()>;

    /// List all stored keys in ascending order
    async fn list_keys(&self) -> ObjectCacheResult<Vec<CacheKey>>;
}

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryObjectCache;
pub use sqlite::SqliteObjectCache;
