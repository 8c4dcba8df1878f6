//! Query orchestration: build text from the rule tree, run it once the dataset
//! is resident, and keep the current view.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::acquisition::{AcquisitionState, DatasetAcquisition};
use crate::display::{DisplayOptions, DisplayTable};
use crate::error::CoreResult;
use crate::executor::QueryExecutor;
use crate::session::QuerySession;
use crate::share::ShareableLocation;

/// What the result pane shows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ViewState {
    #[default]
    Idle,
    Results(DisplayTable),
    /// Error text exactly as the engine or acquisition reported it
    Error(String),
}

impl ViewState {
    pub fn is_error(&self) -> bool {
        matches!(self, ViewState::Error(_))
    }
}

/// Outcome of one [`QueryOrchestrator::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub generation: u64,
    pub view: ViewState,
    /// False when a newer run had already been issued, so the view was not updated
    pub applied: bool,
}

/// Ties a session to its dataset, its executor and its view
pub struct QueryOrchestrator {
    session: Arc<QuerySession>,
    acquisition: Arc<DatasetAcquisition>,
    executor: Arc<dyn QueryExecutor>,
    location: Arc<ShareableLocation>,
    display: DisplayOptions,
    generation: AtomicU64,
    view: RwLock<ViewState>,
}

impl std::fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("session", &self.session)
            .field("acquisition", &self.acquisition)
            .field("generation", &self.generation)
            .field("view", &*self.view.read())
            .finish()
    }
}

impl QueryOrchestrator {
    pub fn new(
        session: Arc<QuerySession>,
        acquisition: Arc<DatasetAcquisition>,
        executor: Arc<dyn QueryExecutor>,
        location: Arc<ShareableLocation>,
        display: DisplayOptions,
    ) -> Self {
        Self {
            session,
            acquisition,
            executor,
            location,
            display,
            generation: AtomicU64::new(0),
            view: RwLock::new(ViewState::Idle),
        }
    }

    pub fn session(&self) -> &QuerySession {
        &self.session
    }

    pub fn acquisition(&self) -> &DatasetAcquisition {
        &self.acquisition
    }

    pub fn location(&self) -> &ShareableLocation {
        &self.location
    }

    pub fn view(&self) -> ViewState {
        self.view.read().clone()
    }

    /// Build query text from the rule tree and commit it
    pub fn build(&self) -> CoreResult<String> {
        self.session.build()
    }

    /// Start loading the dataset without running anything
    pub async fn prepare(&self) -> AcquisitionState {
        self.acquisition.ensure_loaded(self.executor.as_ref()).await
    }

    /// Run the selection, or the whole query text, against the dataset.
    ///
    /// Waits for acquisition first. A failed acquisition becomes an error view
    /// and the executor is never asked to run anything. A run that finishes
    /// after a newer one was issued does not replace the view.
    pub async fn run(&self) -> RunOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let text = self.session.executable_text();
        self.location.mirror(&self.session.query_text());

        let view = match self.acquisition.ensure_loaded(self.executor.as_ref()).await {
            AcquisitionState::Failed(reason) => ViewState::Error(format!(
                "Dataset {} failed to load: {}",
                self.acquisition.key(),
                reason
            )),
            _ => match self.executor.query(&text).await {
                Ok(result) => {
                    info!(generation, rows = result.rows.len(), "query finished");
                    ViewState::Results(DisplayTable::from_result(result, &self.display))
                }
                Err(e) => {
                    warn!(generation, error = %e, "query failed");
                    ViewState::Error(e.to_string())
                }
            },
        };

        let applied = {
            let mut current = self.view.write();
            if self.generation.load(Ordering::SeqCst) == generation {
                *current = view.clone();
                true
            } else {
                debug!(generation, "discarding stale query result");
                false
            }
        };

        RunOutcome {
            generation,
            view,
            applied,
        }
    }

    /// Shareable URL for the mirrored query text on top of `base_url`
    pub fn share_url(&self, base_url: &str) -> CoreResult<Option<String>> {
        self.location.url(base_url)
    }
}
