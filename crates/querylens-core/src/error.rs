use querylens_object_cache::{CacheKey, ObjectCacheError};
use querylens_query::QueryError;
use thiserror::Error;

/// Network fetch failure for a dataset payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid dataset URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Failure reported by the query executor. Engine messages are kept verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("{0}")]
    Engine(String),

    #[error("Failed to register dataset {key}: {message}")]
    Registration { key: CacheKey, message: String },
}

/// Why a dataset could not be made resident
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Dataset fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Dataset registration failed: {0}")]
    Registration(#[from] ExecutorError),
}

/// Core error type for QueryLens sessions
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// Session storage error
    #[error("Session storage error: {0}")]
    SessionStorageError(String),

    /// Input/output error
    #[error("Input/output error: {0}")]
    IOError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    ObjectCache(#[from] ObjectCacheError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
