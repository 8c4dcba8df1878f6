//! Wiring of one explorer session from configuration.

use querylens_object_cache::{InMemoryObjectCache, ObjectCache, SqliteObjectCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::acquisition::DatasetAcquisition;
use crate::config::ExplorerConfig;
use crate::display::DisplayOptions;
use crate::error::CoreResult;
use crate::executor::QueryExecutor;
use crate::fetch::{DatasetFetcher, HttpDatasetFetcher};
use crate::orchestrator::QueryOrchestrator;
use crate::session::QuerySession;
use crate::share::{query_from_url, ShareableLocation};
use crate::storage::{InMemorySessionStorage, JsonFileSessionStorage, SessionStorage};

/// Everything a session needs apart from the query engine
#[derive(Debug, Clone)]
pub struct Explorer {
    config: ExplorerConfig,
    cache: Arc<dyn ObjectCache>,
    session: Arc<QuerySession>,
    acquisition: Arc<DatasetAcquisition>,
    location: Arc<ShareableLocation>,
}

impl Explorer {
    /// Build from configuration. `shared_url` is the URL the session was
    /// opened from; its query text wins over persisted state.
    pub fn from_config(config: ExplorerConfig, shared_url: Option<&str>) -> CoreResult<Self> {
        let cache: Arc<dyn ObjectCache> = match &config.cache.path {
            Some(path) => Arc::new(SqliteObjectCache::new(path.clone())),
            None => Arc::new(InMemoryObjectCache::new()),
        };

        let storage: Arc<dyn SessionStorage> = match &config.session.path {
            Some(path) => Arc::new(JsonFileSessionStorage::open(path)?),
            None => Arc::new(InMemorySessionStorage::new()),
        };

        let fetcher = Arc::new(HttpDatasetFetcher::new(
            &config.dataset.base_url,
            Duration::from_secs(config.dataset.request_timeout_secs),
        )?);

        Self::with_parts(config, cache, storage, fetcher, shared_url.and_then(query_from_url))
    }

    /// Build from explicit collaborators
    pub fn with_parts(
        config: ExplorerConfig,
        cache: Arc<dyn ObjectCache>,
        storage: Arc<dyn SessionStorage>,
        fetcher: Arc<dyn DatasetFetcher>,
        shared_query: Option<String>,
    ) -> CoreResult<Self> {
        config.validate()?;
        let key = config.dataset_key()?;

        let location = Arc::new(ShareableLocation::new(shared_query.clone()));
        let session = Arc::new(QuerySession::open(
            key.clone(),
            storage,
            config.query.clone(),
            shared_query,
        ));
        let acquisition = Arc::new(DatasetAcquisition::new(
            key,
            cache.clone(),
            fetcher,
            config.dataset.min_payload_bytes,
        ));

        info!(dataset = %config.dataset.key, "explorer ready");
        Ok(Self {
            config,
            cache,
            session,
            acquisition,
            location,
        })
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn ObjectCache> {
        &self.cache
    }

    pub fn session(&self) -> &Arc<QuerySession> {
        &self.session
    }

    pub fn acquisition(&self) -> &Arc<DatasetAcquisition> {
        &self.acquisition
    }

    pub fn location(&self) -> &Arc<ShareableLocation> {
        &self.location
    }

    /// Attach a query engine
    pub fn orchestrator(&self, executor: Arc<dyn QueryExecutor>) -> QueryOrchestrator {
        QueryOrchestrator::new(
            self.session.clone(),
            self.acquisition.clone(),
            executor,
            self.location.clone(),
            DisplayOptions::from(self.config.display.clone()),
        )
    }
}
