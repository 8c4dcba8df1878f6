//! Network retrieval of dataset payloads.

use async_trait::async_trait;
use querylens_object_cache::CacheKey;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::FetchError;

/// Fetches the payload for a dataset key
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    async fn fetch(&self, key: &CacheKey) -> Result<Vec<u8>, FetchError>;
}

/// `GET <base_url>/<key>` over HTTP
#[derive(Debug, Clone)]
pub struct HttpDatasetFetcher {
    client: Client,
    base_url: Url,
}

impl HttpDatasetFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// URL the payload for `key` is fetched from
    pub fn url_for(&self, key: &CacheKey) -> Result<Url, FetchError> {
        self.base_url
            .join(key.as_str())
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", key, e)))
    }
}

#[async_trait]
impl DatasetFetcher for HttpDatasetFetcher {
    async fn fetch(&self, key: &CacheKey) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(key)?;
        debug!(%url, "fetching dataset");

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%url, %status, "dataset fetch failed");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!(%url, bytes = bytes.len(), "dataset fetched");
        Ok(bytes.to_vec())
    }
}
