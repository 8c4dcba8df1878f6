//! Logging setup shared by the QueryLens binaries.

use serde::{Deserialize, Serialize};
use tracing::info;

pub mod logging;

pub use logging::{init_logging, LogExt};

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,querylens_core=debug"). `RUST_LOG` wins when set.
    pub log_filter: String,
    /// Emit JSON lines instead of human-readable output
    pub enable_json_logging: bool,
    /// Optional file that receives a daily-rotated JSON copy of the logs
    pub log_file: Option<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "querylens".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
            log_file: None,
        }
    }
}

/// Initialize monitoring system
pub fn init(config: MonitoringConfig) -> anyhow::Result<()> {
    init_logging(&config)?;
    info!(service_name = %config.service_name, "Monitoring initialized");
    Ok(())
}
