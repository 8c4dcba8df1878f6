//! Mock implementation of the QueryExecutor trait.

use async_trait::async_trait;
use mockall::mock;
use querylens_core::{ExecutorError, QueryExecutor, QueryResult};
use querylens_object_cache::CacheKey;

mock! {
    pub QueryExecutor {}

    #[async_trait]
    impl QueryExecutor for QueryExecutor {
        async fn register_buffer(&self, key: &CacheKey, payload: Vec<u8>) -> Result<(), ExecutorError>;
        async fn query(&self, text: &str) -> Result<QueryResult, ExecutorError>;
    }
}

/// A mock that accepts any registration and answers every query with an
/// empty result.
pub fn create_mock_executor() -> MockQueryExecutor {
    let mut mock = MockQueryExecutor::new();
    mock.expect_register_buffer().returning(|_, _| Ok(()));
    mock.expect_query().returning(|_| Ok(QueryResult::default()));
    mock
}
