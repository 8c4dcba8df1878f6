use std::sync::Arc;

use pretty_assertions::assert_eq;
use querylens_core::storage::keys;
use querylens_core::{
    ExecutorError, Explorer, InMemorySessionStorage, InitialQuerySource, SessionStorage, ViewState,
};
use querylens_object_cache::ObjectCache;
use querylens_query::{Operator, Rule, RuleGroup};
use querylens_test_utils::fixtures::{config_for, dataset_key, parquet_like_payload, sample_result};
use querylens_test_utils::mocks::fetcher::{fetcher_returning, unreachable_fetcher};
use querylens_test_utils::{init_test_tracing, FaultyObjectCache, MockQueryExecutor, RecordingExecutor};

const BASE_URL: &str = "http://localhost:5173/";

fn explorer_with(
    cache: FaultyObjectCache,
    storage: Arc<InMemorySessionStorage>,
    payload_len: Option<usize>,
    shared: Option<String>,
) -> Explorer {
    let fetcher = match payload_len {
        Some(len) => fetcher_returning(parquet_like_payload(len), 1),
        None => unreachable_fetcher(),
    };
    Explorer::with_parts(
        config_for(BASE_URL),
        Arc::new(cache),
        storage,
        Arc::new(fetcher),
        shared,
    )
    .unwrap()
}

#[tokio::test]
async fn build_then_run_shows_results_and_shares_text() {
    init_test_tracing();
    let storage = Arc::new(InMemorySessionStorage::new());
    let explorer = explorer_with(FaultyObjectCache::new(), storage.clone(), Some(4096), None);
    let executor = RecordingExecutor::with_response(sample_result());
    let orchestrator = explorer.orchestrator(Arc::new(executor.clone()));

    let text = orchestrator.build().unwrap();
    assert!(text.starts_with("SELECT *\nFROM 'd.parquet'\nWHERE\n"));
    assert!(text.ends_with("LIMIT 100"));
    assert_eq!(storage.get(keys::QUERY).as_deref(), Some(text.as_str()));

    let outcome = orchestrator.run().await;
    assert!(outcome.applied);
    match outcome.view {
        ViewState::Results(table) => {
            assert_eq!(table.rows.len(), 2);
            assert_eq!(
                table.link_for(&table.rows[1], "titleId").as_deref(),
                Some("https://www.imdb.com/title/tt0234215/")
            );
        }
        other => panic!("Expected results, got {:?}", other),
    }

    assert_eq!(executor.queries(), vec![text.clone()]);
    assert_eq!(executor.registrations(), vec![(dataset_key(), 4096)]);

    let url = orchestrator.share_url("https://explorer.local/").unwrap().unwrap();
    let reopened = Explorer::with_parts(
        config_for(BASE_URL),
        Arc::new(FaultyObjectCache::new()),
        Arc::new(InMemorySessionStorage::new()),
        Arc::new(unreachable_fetcher()),
        querylens_core::share::query_from_url(&url),
    )
    .unwrap();
    assert_eq!(reopened.session().initial_source(), InitialQuerySource::SharedLocation);
    assert_eq!(reopened.session().query_text(), text);
}

#[tokio::test]
async fn edited_select_survives_rebuild() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let explorer = explorer_with(FaultyObjectCache::new(), storage, None, None);
    let session = explorer.session();

    session
        .commit_query_text("SELECT title, averageRating FROM 'd.parquet' ORDER BY averageRating DESC LIMIT 10")
        .unwrap();
    session
        .set_rule_tree(RuleGroup::and(Vec::new()).with_rule(Rule::new("numVotes", Operator::GreaterThan, "1000")))
        .unwrap();

    assert_eq!(
        session.build().unwrap(),
        "SELECT title, averageRating\nFROM 'd.parquet'\nWHERE\nnumVotes > 1000\nORDER BY averageRating DESC\nLIMIT 10"
    );
}

#[tokio::test]
async fn persisted_state_is_restored_by_a_new_session() {
    let storage = Arc::new(InMemorySessionStorage::new());
    let first = explorer_with(FaultyObjectCache::new(), storage.clone(), None, None);
    assert_eq!(first.session().initial_source(), InitialQuerySource::Default);
    first.session().commit_query_text("SELECT 7").unwrap();

    let second = explorer_with(FaultyObjectCache::new(), storage, None, None);
    assert_eq!(second.session().initial_source(), InitialQuerySource::Persisted);
    assert_eq!(second.session().query_text(), "SELECT 7");
}

#[tokio::test]
async fn engine_error_is_shown_verbatim() {
    let cache = FaultyObjectCache::new();
    cache
        .inner()
        .put(&dataset_key(), &parquet_like_payload(2048))
        .await
        .unwrap();
    let explorer = explorer_with(cache, Arc::new(InMemorySessionStorage::new()), None, None);

    let mut executor = MockQueryExecutor::new();
    executor.expect_register_buffer().times(1).returning(|_, _| Ok(()));
    executor.expect_query().times(1).returning(|_| {
        Err(ExecutorError::Engine(
            "Parser Error: syntax error at or near \"FORM\"".to_string(),
        ))
    });
    let orchestrator = explorer.orchestrator(Arc::new(executor));
    orchestrator.session().commit_query_text("SELECT * FORM t").unwrap();

    orchestrator.run().await;
    assert_eq!(
        orchestrator.view(),
        ViewState::Error("Parser Error: syntax error at or near \"FORM\"".to_string())
    );
}
