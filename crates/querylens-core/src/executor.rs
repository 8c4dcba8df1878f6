//! Boundary to the embedded analytical engine.

use async_trait::async_trait;
use querylens_object_cache::CacheKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExecutorError;

/// A named, typed result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Rows and schema returned by the engine, both in engine order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub schema: Vec<ColumnSchema>,
    pub rows: Vec<Map<String, Value>>,
}

/// Executes query text against registered binary datasets
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Make `payload` addressable as `key`. Registering the same key again is a no-op.
    async fn register_buffer(&self, key: &CacheKey, payload: Vec<u8>) -> Result<(), ExecutorError>;

    /// Run `text`. Engine failures carry the engine's own message.
    async fn query(&self, text: &str) -> Result<QueryResult, ExecutorError>;
}
