//! Configuration for a QueryLens session
//!
//! Values come from built-in defaults, then an optional config file, then
//! environment variables prefixed `QUERYLENS__` (`__` separates nesting, e.g.
//! `QUERYLENS__DATASET__BASE_URL`).

use config::{Config, Environment, File};
use querylens_monitoring::MonitoringConfig;
use querylens_object_cache::CacheKey;
use querylens_query::defaults::{DEFAULT_DATASET_KEY, DEFAULT_LIMIT, DEFAULT_SELECT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CoreError, CoreResult};

/// Complete explorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    /// Log level filter
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Daily-rotated JSON log file, in addition to stderr output
    #[serde(default)]
    pub log_file: Option<String>,
}

/// Where the dataset lives and how it is validated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_key")]
    pub key: String,

    /// Base URL the dataset key is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Payloads of this size or smaller are treated as placeholders
    #[serde(default = "default_min_payload_bytes")]
    pub min_payload_bytes: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Persistent object cache location. No path means an in-memory cache.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Session persistence location. No path means state lives only in memory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Fallbacks and rendering switches used when building query text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_select")]
    pub select: String,

    #[serde(default)]
    pub order_by: Option<String>,

    #[serde(default = "default_limit")]
    pub limit: Option<String>,

    #[serde(default = "default_true")]
    pub parse_numbers: bool,

    #[serde(default = "default_true")]
    pub case_insensitive_patterns: bool,
}

/// How result tables are laid out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_column_width")]
    pub column_width: u32,

    /// Column name to URL template; `{value}` is replaced by the cell value
    #[serde(default = "default_column_links")]
    pub column_links: BTreeMap<String, String>,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_dataset_key() -> String {
    DEFAULT_DATASET_KEY.to_string()
}

fn default_base_url() -> String {
    "http://localhost:5173/".to_string()
}

fn default_min_payload_bytes() -> usize {
    1000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_select() -> String {
    DEFAULT_SELECT.to_string()
}

fn default_limit() -> Option<String> {
    Some(DEFAULT_LIMIT.to_string())
}

fn default_true() -> bool {
    true
}

fn default_column_width() -> u32 {
    150
}

fn default_column_links() -> BTreeMap<String, String> {
    let mut links = BTreeMap::new();
    links.insert(
        "titleId".to_string(),
        "https://www.imdb.com/title/{value}/".to_string(),
    );
    links
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            query: QueryConfig::default(),
            display: DisplayConfig::default(),
            log_filter: default_log_filter(),
            log_file: None,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            key: default_dataset_key(),
            base_url: default_base_url(),
            min_payload_bytes: default_min_payload_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            select: default_select(),
            order_by: None,
            limit: default_limit(),
            parse_numbers: true,
            case_insensitive_patterns: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            column_width: default_column_width(),
            column_links: default_column_links(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("QUERYLENS")
        .prefix_separator("__")
        .separator("__")
}

impl ExplorerConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        Self::load_with(path, environment())
    }

    /// Load with an explicit environment source
    pub fn load_with(path: Option<&Path>, env: Environment) -> CoreResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config: ExplorerConfig = builder.add_source(env).build()?.try_deserialize()?;

        config.validate()?;
        info!(
            dataset = %config.dataset.key,
            base_url = %config.dataset.base_url,
            cache = ?config.cache.path,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        self.dataset_key()?;

        reqwest::Url::parse(&self.dataset.base_url).map_err(|e| {
            CoreError::ConfigurationError(format!(
                "invalid dataset base_url '{}': {}",
                self.dataset.base_url, e
            ))
        })?;

        if let Some(limit) = &self.query.limit {
            if limit.is_empty() || !limit.chars().all(|c| c.is_ascii_digit()) {
                return Err(CoreError::ConfigurationError(format!(
                    "query limit must be digits only, got '{}'",
                    limit
                )));
            }
        }

        if self.query.select.trim().is_empty() {
            return Err(CoreError::ConfigurationError(
                "query select must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Logging settings for a binary named `service_name`
    pub fn monitoring(&self, service_name: &str, json: bool) -> MonitoringConfig {
        MonitoringConfig {
            service_name: service_name.to_string(),
            log_filter: self.log_filter.clone(),
            enable_json_logging: json,
            log_file: self.log_file.clone(),
        }
    }

    /// The dataset key as a cache key
    pub fn dataset_key(&self) -> CoreResult<CacheKey> {
        CacheKey::new(self.dataset.key.clone())
            .map_err(|e| CoreError::ConfigurationError(e.to_string()))
    }
}
