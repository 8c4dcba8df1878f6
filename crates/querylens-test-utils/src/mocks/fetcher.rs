//! Mock implementation of the DatasetFetcher trait.

use async_trait::async_trait;
use mockall::mock;
use querylens_core::{DatasetFetcher, FetchError};
use querylens_object_cache::CacheKey;

mock! {
    pub DatasetFetcher {}

    #[async_trait]
    impl DatasetFetcher for DatasetFetcher {
        async fn fetch(&self, key: &CacheKey) -> Result<Vec<u8>, FetchError>;
    }
}

/// A fetcher expected to be called exactly `times` times, answering `body`
pub fn fetcher_returning(body: Vec<u8>, times: usize) -> MockDatasetFetcher {
    let mut mock = MockDatasetFetcher::new();
    mock.expect_fetch()
        .times(times)
        .returning(move |_| Ok(body.clone()));
    mock
}

/// A fetcher that must never be called
pub fn unreachable_fetcher() -> MockDatasetFetcher {
    let mut mock = MockDatasetFetcher::new();
    mock.expect_fetch().never();
    mock
}
