//! Session persistence: small text values under fixed keys.
//!
//! Separate from the binary object cache. Reads are served from memory; the
//! file-backed store rewrites its whole document on every change.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Fixed keys used by the session
pub mod keys {
    pub const QUERY: &str = "query";
    pub const QUERY_TREE: &str = "queryTree";
    pub const SELECT: &str = "selectCache";
    pub const ORDER_BY: &str = "orderByCache";
    pub const LIMIT: &str = "limitCache";
}

/// Key-value text storage for session state
pub trait SessionStorage: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> CoreResult<()>;
}

/// Storage that lives as long as the process
#[derive(Debug, Default)]
pub struct InMemorySessionStorage {
    values: RwLock<BTreeMap<String, String>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}

/// Storage persisted as one JSON object on disk
#[derive(Debug)]
pub struct JsonFileSessionStorage {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileSessionStorage {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text).map_err(|e| {
                CoreError::SessionStorageError(format!(
                    "corrupt session file {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = values.len(), "opened session storage");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for JsonFileSessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut values = self.values.write();
        let previous = values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&values) {
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        let mut values = self.values.write();
        if let Some(old) = values.remove(key) {
            if let Err(e) = self.flush(&values) {
                values.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }
}
