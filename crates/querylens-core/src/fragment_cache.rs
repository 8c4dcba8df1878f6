use querylens_query::QueryFragments;
use std::sync::Arc;
use tracing::debug;

use crate::error::CoreResult;
use crate::storage::{keys, SessionStorage};

/// SELECT list, ORDER BY clause and LIMIT value remembered from the last
/// committed query text.
///
/// A fragment found in the committed text is stored; a fragment missing from
/// it is cleared, so removing `ORDER BY` from the text also drops the cached
/// ordering.
#[derive(Debug, Clone)]
pub struct FragmentCache {
    storage: Arc<dyn SessionStorage>,
}

impl FragmentCache {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Extract all three fragments from `text` and store or clear each one
    pub fn extract_and_store(&self, text: &str) -> CoreResult<QueryFragments> {
        let fragments = QueryFragments::extract(text);

        self.store(keys::SELECT, fragments.select.as_deref())?;
        self.store(keys::ORDER_BY, fragments.order_by.as_deref())?;
        self.store(keys::LIMIT, fragments.limit.as_deref())?;

        debug!(
            select = fragments.select.is_some(),
            order_by = fragments.order_by.is_some(),
            limit = fragments.limit.is_some(),
            "cached query fragments"
        );
        Ok(fragments)
    }

    fn store(&self, key: &str, value: Option<&str>) -> CoreResult<()> {
        match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        }
    }

    pub fn select(&self) -> Option<String> {
        self.storage.get(keys::SELECT)
    }

    pub fn order_by(&self) -> Option<String> {
        self.storage.get(keys::ORDER_BY)
    }

    pub fn limit(&self) -> Option<String> {
        self.storage.get(keys::LIMIT)
    }

    /// All three cached values at once
    pub fn current(&self) -> QueryFragments {
        QueryFragments {
            select: self.select(),
            order_by: self.order_by(),
            limit: self.limit(),
        }
    }

    /// Forget every cached fragment
    pub fn reset(&self) -> CoreResult<()> {
        self.storage.remove(keys::SELECT)?;
        self.storage.remove(keys::ORDER_BY)?;
        self.storage.remove(keys::LIMIT)
    }
}
