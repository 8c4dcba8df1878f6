//! Shareable location: the query text mirrored into a bookmarkable URL.

use parking_lot::RwLock;
use reqwest::Url;

use crate::error::{CoreError, CoreResult};

/// Query parameter that carries the query text
pub const QUERY_PARAM: &str = "query";

/// Build a URL that reopens a session with `text` as its query
pub fn share_url(base_url: &str, text: &str) -> CoreResult<String> {
    let mut url = Url::parse(base_url)
        .map_err(|e| CoreError::ConfigurationError(format!("invalid share base URL '{}': {}", base_url, e)))?;

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != QUERY_PARAM)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(QUERY_PARAM, text);

    Ok(url.into())
}

/// Query text carried by a shared URL, if any
pub fn query_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let text = url
        .query_pairs()
        .find(|(name, _)| name == QUERY_PARAM)
        .map(|(_, value)| value.into_owned())?;
    (!text.trim().is_empty()).then_some(text)
}

/// The session's addressable location. Holds the last query text mirrored
/// into it.
#[derive(Debug, Default)]
pub struct ShareableLocation {
    query: RwLock<Option<String>>,
}

impl ShareableLocation {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            query: RwLock::new(initial),
        }
    }

    /// Location parsed from a shared URL
    pub fn from_url(url: &str) -> Self {
        Self::new(query_from_url(url))
    }

    pub fn query(&self) -> Option<String> {
        self.query.read().clone()
    }

    pub fn mirror(&self, text: &str) {
        *self.query.write() = Some(text.to_string());
    }

    /// URL for the mirrored query on top of `base_url`
    pub fn url(&self, base_url: &str) -> CoreResult<Option<String>> {
        self.query()
            .map(|text| share_url(base_url, &text))
            .transpose()
    }
}
