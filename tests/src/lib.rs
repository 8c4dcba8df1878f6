//! Shared setup for the cross-crate scenarios.

use querylens_core::{Explorer, ExplorerConfig};
use querylens_test_utils::fixtures::config_for;
use std::path::Path;

/// Configuration whose cache and session live under `dir`, fetching from `base_url`
pub fn persistent_config(dir: &Path, base_url: &str) -> ExplorerConfig {
    let mut config = config_for(base_url);
    config.cache.path = Some(dir.join("objects.db"));
    config.session.path = Some(dir.join("session.json"));
    config
}

/// Open a session the way a fresh process would
pub fn open_session(dir: &Path, base_url: &str, shared_url: Option<&str>) -> Explorer {
    Explorer::from_config(persistent_config(dir, base_url), shared_url)
        .expect("explorer opens from a valid configuration")
}

/// Temporary workspace for one scenario
pub fn workspace() -> tempfile::TempDir {
    tempfile::tempdir().expect("temporary directory")
}
