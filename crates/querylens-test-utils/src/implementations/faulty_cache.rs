//! Object cache fake whose reads and writes can be made to fail.

use async_trait::async_trait;
use querylens_object_cache::{
    CacheKey, InMemoryObjectCache, ObjectCache, ObjectCacheError, ObjectCacheResult,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps an [`InMemoryObjectCache`], counting calls and optionally failing
/// `get` and/or `put` with `StoreFailure`.
#[derive(Debug, Clone, Default)]
pub struct FaultyObjectCache {
    inner: InMemoryObjectCache,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    gets: Arc<AtomicUsize>,
    puts: Arc<AtomicUsize>,
}

impl FaultyObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads(self) -> Self {
        self.fail_reads.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// The wrapped cache, bypassing fault injection
    pub fn inner(&self) -> &InMemoryObjectCache {
        &self.inner
    }
}

#[async_trait]
impl ObjectCache for FaultyObjectCache {
    async fn put(&self, key: &CacheKey, payload: &[u8]) -> ObjectCacheResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ObjectCacheError::StoreFailure("injected write failure".to_string()));
        }
        self.inner.put(key, payload).await
    }

    async fn get(&self, key: &CacheKey) -> ObjectCacheResult<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ObjectCacheError::StoreFailure("injected read failure".to_string()));
        }
        self.inner.get(key).await
    }

    async fn contains(&self, key: &CacheKey) -> ObjectCacheResult<bool> {
        self.inner.contains(key).await
    }

    async fn delete(&self, key: &CacheKey) -> ObjectCacheResult<()> {
        self.inner.delete(key).await
    }

    async fn list_keys(&self) -> ObjectCacheResult<Vec<CacheKey>> {
        self.inner.list_keys().await
    }
}
