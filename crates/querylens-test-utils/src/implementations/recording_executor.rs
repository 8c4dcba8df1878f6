//! Executor fake that records every call.

use async_trait::async_trait;
use parking_lot::RwLock;
use querylens_core::{ExecutorError, QueryExecutor, QueryResult};
use querylens_object_cache::CacheKey;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Records registrations and queries; answers with a fixed result.
///
/// Re-registering a key replaces the stored payload and is still recorded,
/// so tests can assert how many times acquisition registered a dataset.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    registrations: Arc<RwLock<Vec<(CacheKey, usize)>>>,
    buffers: Arc<RwLock<BTreeMap<CacheKey, Vec<u8>>>>,
    queries: Arc<RwLock<Vec<String>>>,
    response: Arc<RwLock<QueryResult>>,
}

impl fmt::Debug for RecordingExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingExecutor")
            .field("registrations", &self.registrations.read().len())
            .field("queries", &self.queries.read().len())
            .finish()
    }
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every query with `result`
    pub fn with_response(result: QueryResult) -> Self {
        let executor = Self::default();
        *executor.response.write() = result;
        executor
    }

    /// (key, payload length) for each registration, in call order
    pub fn registrations(&self) -> Vec<(CacheKey, usize)> {
        self.registrations.read().clone()
    }

    pub fn buffer(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.buffers.read().get(key).cloned()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.read().clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn register_buffer(&self, key: &CacheKey, payload: Vec<u8>) -> Result<(), ExecutorError> {
        self.registrations.write().push((key.clone(), payload.len()));
        self.buffers.write().insert(key.clone(), payload);
        Ok(())
    }

    async fn query(&self, text: &str) -> Result<QueryResult, ExecutorError> {
        self.queries.write().push(text.to_string());
        Ok(self.response.read().clone())
    }
}
