use std::sync::Arc;

use querylens_core::{AcquisitionState, ViewState};
use querylens_integration_tests::{open_session, workspace};
use querylens_object_cache::{ObjectCache, SqliteObjectCache};
use querylens_test_utils::fixtures::{
    dataset_key, dataset_server, parquet_like_payload, sample_result, DATASET_KEY,
};
use querylens_test_utils::{init_test_tracing, RecordingExecutor};

#[tokio::test]
async fn cold_then_warm_session_fetches_once() {
    init_test_tracing();
    let payload = parquet_like_payload(64 * 1024);
    let server = dataset_server(DATASET_KEY, payload.clone(), 1).await;
    let dir = workspace();

    // Cold: cache file does not exist yet
    let cold = open_session(dir.path(), &server.uri(), None);
    let executor = RecordingExecutor::with_response(sample_result());
    let orchestrator = cold.orchestrator(Arc::new(executor.clone()));

    orchestrator.build().unwrap();
    let outcome = orchestrator.run().await;
    assert!(matches!(outcome.view, ViewState::Results(_)));
    assert_eq!(executor.buffer(&dataset_key()), Some(payload.clone()));
    drop(orchestrator);
    drop(cold);

    // Warm: a new session over the same files must not touch the network
    let warm = open_session(dir.path(), &server.uri(), None);
    let executor = RecordingExecutor::with_response(sample_result());
    let orchestrator = warm.orchestrator(Arc::new(executor.clone()));

    assert_eq!(orchestrator.prepare().await, AcquisitionState::Loaded);
    assert_eq!(executor.buffer(&dataset_key()), Some(payload));

    let outcome = orchestrator.run().await;
    assert!(outcome.applied);
    assert_eq!(executor.queries().len(), 1);

    // Dropping the server verifies the single expected request
}

#[tokio::test]
async fn truncated_cache_entry_is_replaced_from_network() {
    let payload = parquet_like_payload(8 * 1024);
    let server = dataset_server(DATASET_KEY, payload.clone(), 1).await;
    let dir = workspace();

    let store = SqliteObjectCache::new(dir.path().join("objects.db"));
    store.put(&dataset_key(), b"PAR1").await.unwrap();
    drop(store);

    let session = open_session(dir.path(), &server.uri(), None);
    let executor = RecordingExecutor::new();
    let state = session
        .acquisition()
        .ensure_loaded(&executor)
        .await;

    assert_eq!(state, AcquisitionState::Loaded);
    assert_eq!(executor.registrations(), vec![(dataset_key(), payload.len())]);
    assert_eq!(
        session.cache().get(&dataset_key()).await.unwrap().len(),
        payload.len()
    );
}

#[tokio::test]
async fn unreachable_dataset_shows_error_and_skips_queries() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let dir = workspace();

    let session = open_session(dir.path(), &server.uri(), None);
    let executor = RecordingExecutor::new();
    let orchestrator = session.orchestrator(Arc::new(executor.clone()));

    let first = orchestrator.run().await;
    let second = orchestrator.run().await;

    match &first.view {
        ViewState::Error(message) => {
            assert!(message.starts_with("Dataset d.parquet failed to load"));
            assert!(message.contains("404"));
        }
        other => panic!("Expected error view, got {:?}", other),
    }
    assert_eq!(first.view, second.view);
    assert!(executor.queries().is_empty());
    assert!(executor.registrations().is_empty());
}
