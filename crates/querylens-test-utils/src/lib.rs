//! Testing utilities for QueryLens.
//!
//! Mocks for the executor and fetcher seams, fakes with recorded behaviour,
//! and fixtures for datasets and result sets.

pub mod fixtures;
pub mod implementations;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use implementations::faulty_cache::FaultyObjectCache;
pub use implementations::recording_executor::RecordingExecutor;
pub use mocks::executor::MockQueryExecutor;
pub use mocks::fetcher::MockDatasetFetcher;

/// Installs a test-writer subscriber once per test binary
pub fn init_test_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_target(false)
        .with_test_writer()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
