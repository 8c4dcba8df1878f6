//! Test data: dataset payloads, result sets, configuration and HTTP servers.

use querylens_core::{ColumnSchema, ExplorerConfig, QueryResult};
use querylens_object_cache::CacheKey;
use serde_json::{json, Map, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Key used throughout the tests
pub const DATASET_KEY: &str = "d.parquet";

pub fn dataset_key() -> CacheKey {
    CacheKey::new(DATASET_KEY).expect("fixture key is valid")
}

/// A payload of `len` bytes framed like a parquet file (`PAR1` magic at both ends)
pub fn parquet_like_payload(len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; len.max(8)];
    payload[..4].copy_from_slice(b"PAR1");
    let end = payload.len();
    payload[end - 4..].copy_from_slice(b"PAR1");
    payload
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture row must be an object, got {}", other),
    }
}

/// Two IMDB-shaped rows
pub fn sample_result() -> QueryResult {
    QueryResult {
        schema: vec![
            ColumnSchema::new("titleId", "VARCHAR"),
            ColumnSchema::new("title", "VARCHAR"),
            ColumnSchema::new("averageRating", "DOUBLE"),
        ],
        rows: vec![
            object(json!({"titleId": "tt0133093", "title": "The Matrix", "averageRating": 8.7})),
            object(json!({"titleId": "tt0234215", "title": "The Matrix Reloaded", "averageRating": 7.2})),
        ],
    }
}

/// Configuration pointing at `base_url` for dataset [`DATASET_KEY`]
pub fn config_for(base_url: &str) -> ExplorerConfig {
    let mut config = ExplorerConfig::default();
    config.dataset.key = DATASET_KEY.to_string();
    config.dataset.base_url = base_url.to_string();
    config.dataset.request_timeout_secs = 5;
    config
}

/// A server that serves `body` at `/<key>` and expects exactly `expected_hits` requests
pub async fn dataset_server(key: &str, body: Vec<u8>, expected_hits: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{}", key)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(expected_hits)
        .mount(&server)
        .await;
    server
}
