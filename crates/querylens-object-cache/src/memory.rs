//! In-memory implementation of ObjectCache
//!
//! This implementation is intended for testing and for sessions that run
//! without a configured cache path. All data is lost when the instance is dropped.

use crate::{CacheKey, ObjectCache, ObjectCacheError, ObjectCacheResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory implementation of ObjectCache
///
/// An optional byte quota mimics the storage limits of a persistent backend:
/// a put that would push the total above the quota fails with `QuotaExceeded`
/// and leaves the previous value in place.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectCache {
    objects: Arc<RwLock<BTreeMap<CacheKey, Vec<u8>>>>,
    quota_bytes: Option<usize>,
}

impl InMemoryObjectCache {
    /// Create a new, unbounded in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory cache that refuses to hold more than `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently held
    pub async fn total_bytes(&self) -> usize {
        self.objects.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ObjectCache for InMemoryObjectCache {
    async fn put(&self, key: &CacheKey, payload: &[u8]) -> ObjectCacheResult<()> {
        let mut store = self.objects.write().await;

        if let Some(limit) = self.quota_bytes {
            let others: usize = store
                .iter()
                .filter(|(k, _)| *k != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + payload.len() > limit {
                return Err(ObjectCacheError::QuotaExceeded {
                    key: key.clone(),
                    size: payload.len(),
                    limit,
                });
            }
        }

        debug!(key = %key, bytes = payload.len(), "storing object in memory");
        store.insert(key.clone(), payload.to_vec());
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> ObjectCacheResult<Vec<u8>> {
        let store = self.objects.read().await;

        match store.get(key) {
            Some(payload) => Ok(payload.clone()),
            None => Err(ObjectCacheError::NotFound(key.clone())),
        }
    }

    async fn contains(&self, key: &CacheKey) -> ObjectCacheResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn delete(&self, key: &CacheKey) -> ObjectCacheResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> ObjectCacheResult<Vec<CacheKey>> {
        Ok(self.objects.read().await.keys().cloned().collect())
    }
}
