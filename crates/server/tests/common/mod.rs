//! Common test utilities for E2E testing with mocks.
//!
//! Builds an in-process server whose pipeline talks to a [`MockMediaApi`]
//! and keeps its stores in a temporary database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use cratedigger_core::crawl::SqliteCrawlStateStore;
use cratedigger_core::testing::{FixedScorer, MockMediaApi};
use cratedigger_core::{
    create_authenticator, load_config_from_str, Authenticator, CandidateStore, CatalogStore,
    HeuristicScorer, MediaApi, Pipeline, Scorer, SearchCrawler, SqliteCandidateStore,
    SqliteCatalogStore,
};
use cratedigger_server::api::create_router;
use cratedigger_server::state::AppState;

/// Re-export fixtures for test convenience
pub use cratedigger_core::testing::fixtures;

/// Test fixture with a mock media API behind the real router.
pub struct TestFixture {
    pub router: Router,
    /// Mock media API - configure containers, searches and details
    pub api: Arc<MockMediaApi>,
    pub state: Arc<AppState>,
    /// Holds the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Default)]
pub struct TestConfig {
    /// Scorer for the pipeline; `None` uses the heuristic scorer.
    pub scorer: Option<FixedScorer>,
    /// Require this shared secret on protected routes.
    pub secret: Option<String>,
    pub crawl_queries: Vec<String>,
    pub default_containers: Vec<String>,
    /// Leave the pipeline and crawler out of the state.
    pub without_pipeline: bool,
}

impl TestConfig {
    pub fn with_scorer(scorer: FixedScorer) -> Self {
        Self {
            scorer: Some(scorer),
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth_toml = match &test_config.secret {
            Some(secret) => format!(
                "[auth]\nmethod = \"shared_secret\"\nsecret = \"{}\"\n",
                secret
            ),
            None => "[auth]\nmethod = \"none\"\n".to_string(),
        };
        let mut config = load_config_from_str(&auth_toml).expect("Failed to parse test config");
        config.database.path = db_path.clone();
        config.pipeline.batch_delay_ms = 0;
        config.ingestion.page_delay_ms = 0;
        config.ingestion.default_containers = test_config.default_containers.clone();
        config.crawl.queries = test_config.crawl_queries.clone();
        config.crawl.page_delay_ms = 0;

        let authenticator: Arc<dyn Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );

        let api = Arc::new(MockMediaApi::new());
        let mut state = AppState::new(config.clone(), authenticator);

        if !test_config.without_pipeline {
            let candidates: Arc<dyn CandidateStore> = Arc::new(
                SqliteCandidateStore::new(&db_path).expect("Failed to create candidate store"),
            );
            let catalog: Arc<dyn CatalogStore> = Arc::new(
                SqliteCatalogStore::new(&db_path).expect("Failed to create catalog store"),
            );
            let scorer: Arc<dyn Scorer> = match test_config.scorer {
                Some(fixed) => Arc::new(fixed),
                None => Arc::new(HeuristicScorer::new()),
            };
            let pipeline = Arc::new(
                Pipeline::new(
                    candidates,
                    catalog,
                    Arc::clone(&api) as Arc<dyn MediaApi>,
                    scorer,
                )
                .with_config(config.pipeline.clone())
                .with_ingestion(config.ingestion.clone())
                .with_reputation(config.reputation),
            );
            let crawler = Arc::new(SearchCrawler::new(
                Arc::clone(&pipeline),
                Arc::new(
                    SqliteCrawlStateStore::new(&db_path)
                        .expect("Failed to create crawl state store"),
                ),
                config.crawl.clone(),
            ));
            state = state.with_pipeline(pipeline).with_crawler(crawler);
        }

        let state = Arc::new(state);
        let router = create_router(Arc::clone(&state));

        Self {
            router,
            api,
            state,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with no body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request and return the raw body text (for non-JSON endpoints).
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
