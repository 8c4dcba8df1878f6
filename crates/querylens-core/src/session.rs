//! Session state: the query text, the rule tree, and the text selection.
//!
//! The query text is authoritative for what runs. The rule tree only ever
//! produces a new query text through [`QuerySession::build`]; it is never
//! re-derived from text.

use parking_lot::RwLock;
use querylens_object_cache::CacheKey;
use querylens_query::{
    assemble, dataset_ref, default_query, default_rule_tree, FormatOptions, QueryParts,
    RuleCompiler, RuleGroup, RuleProcessor,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::QueryConfig;
use crate::error::CoreResult;
use crate::fragment_cache::FragmentCache;
use crate::storage::{keys, SessionStorage};

#[derive(Debug, Clone)]
struct SessionState {
    query_text: String,
    rule_tree: RuleGroup,
    selection: Option<String>,
}

/// Where the initial query text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialQuerySource {
    SharedLocation,
    Persisted,
    Default,
}

/// Query text, rule tree and fragment cache for one dataset
#[derive(Debug)]
pub struct QuerySession {
    dataset_key: CacheKey,
    storage: Arc<dyn SessionStorage>,
    fragments: FragmentCache,
    compiler: RuleCompiler,
    settings: QueryConfig,
    initial_source: InitialQuerySource,
    state: RwLock<SessionState>,
}

impl QuerySession {
    /// Restore a session. The initial query text is the shared location's
    /// query if present, else the persisted text, else the default query.
    /// The rule tree is the persisted tree, else the default tree.
    pub fn open(
        dataset_key: CacheKey,
        storage: Arc<dyn SessionStorage>,
        settings: QueryConfig,
        shared_query: Option<String>,
    ) -> Self {
        let (query_text, initial_source) = match (shared_query, storage.get(keys::QUERY)) {
            (Some(shared), _) => (shared, InitialQuerySource::SharedLocation),
            (None, Some(persisted)) => (persisted, InitialQuerySource::Persisted),
            (None, None) => (default_query(dataset_key.as_str()), InitialQuerySource::Default),
        };

        let rule_tree = match storage.get(keys::QUERY_TREE) {
            Some(json) => RuleGroup::from_json(&json).unwrap_or_else(|e| {
                warn!(error = %e, "persisted rule tree unreadable, using default");
                default_rule_tree()
            }),
            None => default_rule_tree(),
        };

        let processor = if settings.case_insensitive_patterns {
            RuleProcessor::case_insensitive()
        } else {
            RuleProcessor::new()
        };
        let compiler = RuleCompiler::new(
            processor,
            FormatOptions {
                parse_numbers: settings.parse_numbers,
            },
        );

        info!(dataset = %dataset_key, source = ?initial_source, "query session opened");

        Self {
            dataset_key,
            fragments: FragmentCache::new(storage.clone()),
            storage,
            compiler,
            settings,
            initial_source,
            state: RwLock::new(SessionState {
                query_text,
                rule_tree,
                selection: None,
            }),
        }
    }

    pub fn dataset_key(&self) -> &CacheKey {
        &self.dataset_key
    }

    pub fn initial_source(&self) -> InitialQuerySource {
        self.initial_source
    }

    pub fn query_text(&self) -> String {
        self.state.read().query_text.clone()
    }

    pub fn rule_tree(&self) -> RuleGroup {
        self.state.read().rule_tree.clone()
    }

    pub fn fragments(&self) -> &FragmentCache {
        &self.fragments
    }

    pub fn selection(&self) -> Option<String> {
        self.state.read().selection.clone()
    }

    /// Record the user's current text selection. Blank selections count as none.
    pub fn set_selection(&self, selection: Option<String>) {
        self.state.write().selection = selection.filter(|s| !s.trim().is_empty());
    }

    /// Text a run submits: the selection if there is one, otherwise the whole query
    pub fn executable_text(&self) -> String {
        let state = self.state.read();
        state
            .selection
            .clone()
            .unwrap_or_else(|| state.query_text.clone())
    }

    /// Refresh the fragment cache, persist `text`, then make it current. The
    /// query key is written last, so a failed commit leaves both the stored and
    /// the current text as they were.
    pub fn commit_query_text(&self, text: impl Into<String>) -> CoreResult<()> {
        let text = text.into();
        self.fragments.extract_and_store(&text)?;
        self.storage.set(keys::QUERY, &text)?;

        let mut state = self.state.write();
        state.query_text = text;
        state.selection = None;
        Ok(())
    }

    /// Replace and persist the rule tree. The query text is left alone.
    pub fn set_rule_tree(&self, tree: RuleGroup) -> CoreResult<()> {
        self.storage.set(keys::QUERY_TREE, &tree.to_json()?)?;
        self.state.write().rule_tree = tree;
        Ok(())
    }

    /// Generate query text from the rule tree and cached fragments, commit it
    /// and return it
    pub fn build(&self) -> CoreResult<String> {
        let clause = self.compiler.compile(&self.state.read().rule_tree);

        let select = self
            .fragments
            .select()
            .unwrap_or_else(|| self.settings.select.clone());
        let order_by = self.fragments.order_by().or_else(|| self.settings.order_by.clone());
        let limit = self.fragments.limit().or_else(|| self.settings.limit.clone());
        let source = dataset_ref(self.dataset_key.as_str());

        let text = assemble(&QueryParts {
            select: &select,
            dataset_ref: &source,
            where_clause: &clause,
            order_by: order_by.as_deref(),
            limit: limit.as_deref(),
        });
        debug!(bytes = text.len(), "built query text");

        self.commit_query_text(text.clone())?;
        Ok(text)
    }

    /// Forget cached fragments so the next build uses configured defaults
    pub fn reset_fragments(&self) -> CoreResult<()> {
        self.fragments.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::storage::InMemorySessionStorage;
    use pretty_assertions::assert_eq;
    use querylens_query::{Operator, Rule};

    fn key() -> CacheKey {
        CacheKey::new("d.parquet").unwrap()
    }

    fn session_with(storage: Arc<dyn SessionStorage>, shared: Option<String>) -> QuerySession {
        QuerySession::open(key(), storage, QueryConfig::default(), shared)
    }

    fn fresh() -> QuerySession {
        session_with(Arc::new(InMemorySessionStorage::new()), None)
    }

    #[test]
    fn test_initial_state_precedence() {
        let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());

        let session = session_with(storage.clone(), None);
        assert_eq!(session.initial_source(), InitialQuerySource::Default);
        assert_eq!(session.query_text(), default_query("d.parquet"));
        assert_eq!(session.rule_tree(), default_rule_tree());

        storage.set(keys::QUERY, "SELECT 1").unwrap();
        let session = session_with(storage.clone(), None);
        assert_eq!(session.initial_source(), InitialQuerySource::Persisted);
        assert_eq!(session.query_text(), "SELECT 1");

        let session = session_with(storage, Some("SELECT 2".to_string()));
        assert_eq!(session.initial_source(), InitialQuerySource::SharedLocation);
        assert_eq!(session.query_text(), "SELECT 2");
    }

    /// Storage that refuses writes to one key
    #[derive(Debug, Default)]
    struct RefusingStorage {
        inner: InMemorySessionStorage,
        refuse: &'static str,
    }

    impl SessionStorage for RefusingStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> CoreResult<()> {
            if key == self.refuse {
                return Err(CoreError::SessionStorageError(format!("{} is read-only", key)));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> CoreResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_failed_commit_keeps_stored_and_current_text_together() {
        let storage = Arc::new(RefusingStorage {
            refuse: keys::SELECT,
            ..Default::default()
        });
        storage.inner.set(keys::QUERY, "SELECT 1").unwrap();
        let session = session_with(storage.clone(), None);

        assert!(session.commit_query_text("SELECT title FROM t").is_err());
        assert_eq!(session.query_text(), "SELECT 1");
        assert_eq!(storage.get(keys::QUERY).as_deref(), Some("SELECT 1"));

        let storage = Arc::new(RefusingStorage {
            refuse: keys::QUERY,
            ..Default::default()
        });
        let session = session_with(storage.clone(), None);
        let before = session.query_text();

        assert!(session.commit_query_text("SELECT title FROM t").is_err());
        assert_eq!(session.query_text(), before);
        assert!(storage.get(keys::QUERY).is_none());
    }

    #[test]
    fn test_unreadable_tree_falls_back_to_default() {
        let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        storage.set(keys::QUERY_TREE, "{ broken").unwrap();

        assert_eq!(session_with(storage, None).rule_tree(), default_rule_tree());
    }

    #[test]
    fn test_build_with_no_cached_fragments_uses_settings() {
        let session = fresh();
        session
            .set_rule_tree(RuleGroup::and(vec![]).with_rule(Rule::new("title", Operator::Contains, "matrix")))
            .unwrap();

        assert_eq!(
            session.build().unwrap(),
            "SELECT *\nFROM 'd.parquet'\nWHERE\nUPPER(title) LIKE UPPER('%matrix%')\nLIMIT 100"
        );
    }

    #[test]
    fn test_build_keeps_user_edited_fragments() {
        let session = fresh();
        session
            .commit_query_text("SELECT title, numVotes FROM 'd.parquet' WHERE 1=1 ORDER BY numVotes DESC LIMIT 7")
            .unwrap();
        session
            .set_rule_tree(RuleGroup::and(vec![]).with_rule(Rule::new("startYear", Operator::GreaterThan, "2010")))
            .unwrap();

        let text = session.build().unwrap();
        assert_eq!(
            text,
            "SELECT title, numVotes\nFROM 'd.parquet'\nWHERE\nstartYear > 2010\nORDER BY numVotes DESC\nLIMIT 7"
        );
        assert_eq!(session.query_text(), text);
    }

    #[test]
    fn test_removed_order_by_stays_removed_after_build() {
        let session = fresh();
        session
            .commit_query_text("SELECT * FROM t ORDER BY a LIMIT 5")
            .unwrap();
        session.commit_query_text("SELECT * FROM t LIMIT 5").unwrap();

        let text = session.build().unwrap();
        assert!(!text.contains("ORDER BY"));
        assert!(text.ends_with("LIMIT 5"));
    }

    #[test]
    fn test_build_is_stable() {
        let session = fresh();
        let first = session.build().unwrap();
        let second = session.build().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_state_is_persisted() {
        let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        let session = session_with(storage.clone(), None);
        let tree = RuleGroup::or(vec![]).with_rule(Rule::new("genres", Operator::Contains, "Drama"));

        session.set_rule_tree(tree.clone()).unwrap();
        session.commit_query_text("SELECT genres FROM t").unwrap();

        let restored = session_with(storage, None);
        assert_eq!(restored.query_text(), "SELECT genres FROM t");
        assert_eq!(restored.rule_tree(), tree);
        assert_eq!(restored.fragments().select().as_deref(), Some("genres"));
    }

    #[test]
    fn test_selection_takes_precedence_until_commit() {
        let session = fresh();
        session.commit_query_text("SELECT 1;\nSELECT 2;").unwrap();

        session.set_selection(Some("SELECT 2;".to_string()));
        assert_eq!(session.executable_text(), "SELECT 2;");

        session.set_selection(Some("   ".to_string()));
        assert_eq!(session.executable_text(), "SELECT 1;\nSELECT 2;");

        session.set_selection(Some("SELECT 1;".to_string()));
        session.commit_query_text("SELECT 3").unwrap();
        assert_eq!(session.selection(), None);
    }

    #[test]
    fn test_reset_fragments_restores_defaults() {
        let session = fresh();
        session
            .commit_query_text("SELECT a FROM t ORDER BY a LIMIT 3")
            .unwrap();
        session.reset_fragments().unwrap();
        session.set_rule_tree(RuleGroup::default()).unwrap();

        assert_eq!(session.build().unwrap(), "SELECT *\nFROM 'd.parquet'\nLIMIT 100");
    }
}
