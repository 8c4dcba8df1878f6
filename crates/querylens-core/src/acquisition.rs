//! Dataset acquisition: cache first, network second, then executor registration.
//!
//! ```text
//! Unloaded -> Loading -> Loaded
//!                     \-> Failed
//! ```
//!
//! Both `Loaded` and `Failed` are terminal for the lifetime of a
//! [`DatasetAcquisition`]; a failed acquisition is not retried.

use querylens_monitoring::LogExt;
use querylens_object_cache::{CacheKey, ObjectCache};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::AcquisitionError;
use crate::executor::QueryExecutor;
use crate::fetch::DatasetFetcher;

/// Residency of the session dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionState {
    Unloaded,
    Loading,
    Loaded,
    /// Terminal failure with the reason shown to the user
    Failed(String),
}

impl AcquisitionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AcquisitionState::Loaded | AcquisitionState::Failed(_))
    }
}

/// Where a resolved payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadSource {
    Cache,
    Network,
}

impl fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadSource::Cache => f.write_str("cache"),
            PayloadSource::Network => f.write_str("network"),
        }
    }
}

/// Makes one dataset resident for a session
pub struct DatasetAcquisition {
    key: CacheKey,
    cache: Arc<dyn ObjectCache>,
    fetcher: Arc<dyn DatasetFetcher>,
    min_payload_bytes: usize,
    state: watch::Sender<AcquisitionState>,
    // Serialises acquisitions so concurrent callers observe one attempt
    gate: Mutex<()>,
}

impl fmt::Debug for DatasetAcquisition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetAcquisition")
            .field("key", &self.key)
            .field("cache", &self.cache)
            .field("min_payload_bytes", &self.min_payload_bytes)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl DatasetAcquisition {
    pub fn new(
        key: CacheKey,
        cache: Arc<dyn ObjectCache>,
        fetcher: Arc<dyn DatasetFetcher>,
        min_payload_bytes: usize,
    ) -> Self {
        let (state, _) = watch::channel(AcquisitionState::Unloaded);
        Self {
            key,
            cache,
            fetcher,
            min_payload_bytes,
            state,
            gate: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn state(&self) -> AcquisitionState {
        self.state.borrow().clone()
    }

    /// Watch state transitions, e.g. to drive a loading indicator
    pub fn subscribe(&self) -> watch::Receiver<AcquisitionState> {
        self.state.subscribe()
    }

    fn transition(&self, next: AcquisitionState) {
        info!(key = %self.key, state = ?next, "dataset acquisition state");
        self.state.send_replace(next);
    }

    /// Make the dataset resident and registered with `executor`.
    ///
    /// Never returns an error: failures resolve into `Failed`. Calling again
    /// after a terminal state returns that state without side effects.
    pub async fn ensure_loaded(&self, executor: &dyn QueryExecutor) -> AcquisitionState {
        let _guard = self.gate.lock().await;

        let current = self.state();
        if current.is_terminal() {
            return current;
        }

        self.transition(AcquisitionState::Loading);

        let outcome = match self.resolve_payload().await {
            Ok((payload, source)) => {
                debug!(key = %self.key, %source, bytes = payload.len(), "registering dataset");
                executor
                    .register_buffer(&self.key, payload)
                    .await
                    .map_err(AcquisitionError::from)
            }
            Err(e) => Err(e),
        };

        let next = match outcome {
            Ok(()) => AcquisitionState::Loaded,
            Err(e) => {
                error!(key = %self.key, error = %e, "dataset acquisition failed");
                AcquisitionState::Failed(e.to_string())
            }
        };
        self.transition(next.clone());
        next
    }

    /// Produce the payload bytes: a valid cached copy, or a fresh network
    /// fetch that is then written back to the cache on a best-effort basis.
    pub async fn resolve_payload(&self) -> Result<(Vec<u8>, PayloadSource), AcquisitionError> {
        match self.cache.get(&self.key).await {
            Ok(payload) if payload.len() > self.min_payload_bytes => {
                debug!(key = %self.key, bytes = payload.len(), "dataset cache hit");
                return Ok((payload, PayloadSource::Cache));
            }
            Ok(payload) => {
                warn!(
                    key = %self.key,
                    bytes = payload.len(),
                    min_bytes = self.min_payload_bytes,
                    "cached dataset too small, refetching"
                );
            }
            Err(e) if e.is_not_found() => {
                debug!(key = %self.key, "dataset cache miss");
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "dataset cache read failed, refetching");
            }
        }

        let payload = self.fetcher.fetch(&self.key).await?;

        let _ = self
            .cache
            .put(&self.key, &payload)
            .await
            .log_warn("Failed to store dataset in cache");

        Ok((payload, PayloadSource::Network))
    }
}
