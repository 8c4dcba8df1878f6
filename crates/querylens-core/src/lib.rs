//! QueryLens Core
//!
//! Session-level machinery around the query compiler:
//!
//! - dataset acquisition through the object cache with a network fallback
//! - the fragment cache and session persistence
//! - the orchestrator that builds query text, runs it once the dataset is
//!   registered, and maps results for display
//!
//! The query engine itself is an external collaborator behind [`QueryExecutor`].

pub mod acquisition;
pub mod config;
pub mod display;
pub mod error;
pub mod executor;
pub mod explorer;
pub mod fetch;
pub mod fragment_cache;
pub mod orchestrator;
pub mod session;
pub mod share;
pub mod storage;

pub use acquisition::{AcquisitionState, DatasetAcquisition, PayloadSource};
pub use config::ExplorerConfig;
pub use display::{DisplayColumn, DisplayOptions, DisplayRow, DisplayTable};
pub use error::{AcquisitionError, CoreError, CoreResult, ExecutorError, FetchError};
pub use executor::{ColumnSchema, QueryExecutor, QueryResult};
pub use explorer::Explorer;
pub use fetch::{DatasetFetcher, HttpDatasetFetcher};
pub use fragment_cache::FragmentCache;
pub use orchestrator::{QueryOrchestrator, RunOutcome, ViewState};
pub use session::{InitialQuerySource, QuerySession};
pub use share::{share_url, ShareableLocation};
pub use storage::{InMemorySessionStorage, JsonFileSessionStorage, SessionStorage};
