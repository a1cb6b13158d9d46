//! End-to-end tests with a mocked media API.
//!
//! These tests run the full router in-process; stores live in a temporary
//! SQLite database and every outbound call goes to `MockMediaApi`.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use cratedigger_core::fetch::ApiOperation;
use cratedigger_core::testing::{FixedScorer, MockFailure};

use common::{fixtures, TestConfig, TestFixture};

const A: &str = "AAAAAAAAAAA";
const B: &str = "BBBBBBBBBBB";
const C: &str = "CCCCCCCCCCC";

/// A playlist of three items with details for each.
async fn seed_playlist(fixture: &TestFixture) {
    fixture
        .api
        .add_container("PLcrate", vec![vec![A, B], vec![C]])
        .await;
    fixture
        .api
        .add_details(fixtures::item_details(A, "Deep cut one", "UCone"))
        .await;
    fixture
        .api
        .add_details(fixtures::item_details(B, "Deep cut two", "UCone"))
        .await;
    fixture
        .api
        .add_details(fixtures::item_details(C, "Deep cut three", "UCtwo"))
        .await;
}

fn scorer() -> FixedScorer {
    FixedScorer::new(40).with_score(A, 80).with_score(C, 90)
}

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::with_config(TestConfig {
        secret: Some("hunter2".to_string()),
        ..Default::default()
    })
    .await;

    let response = fixture.get("/api/v1/config?secret=hunter2").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["auth"]["method"], "shared_secret");
    assert_eq!(response.body["auth"]["secret_configured"], true);
    assert!(response.body["auth"].get("secret").is_none());
    assert_eq!(response.body["api"]["keys_configured"], 0);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_secret_required_on_protected_routes() {
    let fixture = TestFixture::with_config(TestConfig {
        secret: Some("hunter2".to_string()),
        ..Default::default()
    })
    .await;

    let response = fixture.post_empty("/api/v1/enrich").await;
    assert_status!(response, StatusCode::UNAUTHORIZED);
    assert!(response.body["error"].is_string());

    let response = fixture.post_empty("/api/v1/enrich?secret=wrong").await;
    assert_status!(response, StatusCode::UNAUTHORIZED);

    let response = fixture.post_empty("/api/v1/enrich?secret=hunter2").await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let fixture = TestFixture::with_config(TestConfig {
        secret: Some("hunter2".to_string()),
        ..Default::default()
    })
    .await;

    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
}

// =============================================================================
// Pipeline stages
// =============================================================================

#[tokio::test]
async fn test_ingest_enrich_score_process_flow() {
    let fixture = TestFixture::with_config(TestConfig::with_scorer(scorer())).await;
    seed_playlist(&fixture).await;

    let response = fixture.post_empty("/api/v1/ingest?source=PLcrate").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["added"], 3);
    assert_eq!(response.body["skipped"], 0);

    // Re-ingesting the same playlist only finds known items
    let response = fixture.post_empty("/api/v1/ingest?source=PLcrate").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["added"], 0);
    assert_eq!(response.body["skipped"], 3);

    let response = fixture.post_empty("/api/v1/enrich").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["enriched"], 3);
    assert_eq!(response.body["missing"], 0);
    assert_eq!(fixture.api.calls_for(ApiOperation::ItemDetails).await, 1);

    let response = fixture.post_empty("/api/v1/score").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["scored"], 3);

    let response = fixture.post_empty("/api/v1/process").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["promoted"], 2);
    assert_eq!(response.body["failed"], 0);

    // Nothing left to do on a second pass
    let response = fixture.post_empty("/api/v1/process").await;
    assert_eq!(response.body["promoted"], 0);

    let stats = fixture.get("/api/v1/stats").await;
    assert_status!(stats, StatusCode::OK);
    assert_eq!(stats.body["candidates"]["total"], 3);
    assert_eq!(stats.body["candidates"]["promoted"], 2);
    assert_eq!(stats.body["candidates"]["scored"], 1);
    assert_eq!(stats.body["catalog"]["samples"], 2);
    assert_eq!(stats.body["catalog"]["channels"], 2);
}

#[tokio::test]
async fn test_process_with_lower_min_score() {
    let fixture = TestFixture::with_config(TestConfig::with_scorer(scorer())).await;
    seed_playlist(&fixture).await;

    fixture.post_empty("/api/v1/ingest?source=PLcrate").await;
    fixture.post_empty("/api/v1/enrich").await;
    fixture.post_empty("/api/v1/score").await;

    let response = fixture.post_empty("/api/v1/process?min_score=30").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["promoted"], 3);
}

#[tokio::test]
async fn test_enrich_respects_limit() {
    let fixture = TestFixture::new().await;
    seed_playlist(&fixture).await;
    fixture.post_empty("/api/v1/ingest?source=PLcrate").await;

    let response = fixture.post_empty("/api/v1/enrich?limit=2").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["enriched"], 2);

    let response = fixture.post_empty("/api/v1/enrich?limit=2").await;
    assert_eq!(response.body["enriched"], 1);

    let response = fixture.post_empty("/api/v1/enrich").await;
    assert_eq!(response.body["enriched"], 0);
}

#[tokio::test]
async fn test_run_batch() {
    let fixture = TestFixture::with_config(TestConfig::with_scorer(scorer())).await;
    seed_playlist(&fixture).await;
    fixture.post_empty("/api/v1/ingest?source=PLcrate").await;

    let response = fixture.post_empty("/api/v1/run-batch").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["enriched"], 3);
    assert_eq!(response.body["scored"], 3);
    assert_eq!(response.body["promoted"], 2);
    assert_eq!(response.body["quota_exhausted"], false);
}

#[tokio::test]
async fn test_run_batch_continues_after_enrich_quota() {
    let fixture = TestFixture::with_config(TestConfig::with_scorer(scorer())).await;
    seed_playlist(&fixture).await;
    fixture.post_empty("/api/v1/ingest?source=PLcrate").await;
    fixture
        .api
        .fail_after(ApiOperation::ItemDetails, 0, MockFailure::Quota)
        .await;

    let response = fixture.post_empty("/api/v1/run-batch").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["enriched"], 0);
    assert_eq!(response.body["promoted"], 0);
    assert_eq!(response.body["quota_exhausted"], true);
}

#[tokio::test]
async fn test_ingest_defaults() {
    let fixture = TestFixture::with_config(TestConfig {
        default_containers: vec!["PLcrate".to_string(), "PLother".to_string()],
        ..Default::default()
    })
    .await;
    seed_playlist(&fixture).await;
    fixture
        .api
        .add_container("PLother", vec![vec!["DDDDDDDDDDD"]])
        .await;

    let response = fixture.post_empty("/api/v1/ingest").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["added"], 4);
}

#[tokio::test]
async fn test_ingest_channel_by_kind() {
    let fixture = TestFixture::new().await;
    seed_playlist(&fixture).await;
    fixture.api.add_source("UCcrate", "PLcrate").await;

    let response = fixture
        .post_empty("/api/v1/ingest?source=UCcrate&kind=channel")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["added"], 3);
}

#[tokio::test]
async fn test_ingest_partial_failure_keeps_items() {
    let fixture = TestFixture::new().await;
    seed_playlist(&fixture).await;
    fixture
        .api
        .fail_after(ApiOperation::ContainerPage, 1, MockFailure::Server)
        .await;

    let response = fixture.post_empty("/api/v1/ingest?source=PLcrate").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["added"], 2);
    assert!(response.body["error"].is_string());
}

// =============================================================================
// Error mapping
// =============================================================================

#[tokio::test]
async fn test_ingest_quota_is_429() {
    let fixture = TestFixture::new().await;
    seed_playlist(&fixture).await;
    fixture
        .api
        .fail_after(ApiOperation::ContainerPage, 0, MockFailure::Quota)
        .await;

    let response = fixture.post_empty("/api/v1/ingest?source=PLcrate").await;
    assert_status!(response, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["quota_exceeded"], true);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_enrich_quota_is_429() {
    let fixture = TestFixture::new().await;
    seed_playlist(&fixture).await;
    fixture.post_empty("/api/v1/ingest?source=PLcrate").await;
    fixture
        .api
        .fail_after(ApiOperation::ItemDetails, 0, MockFailure::Quota)
        .await;

    let response = fixture.post_empty("/api/v1/enrich").await;
    assert_status!(response, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["quota_exceeded"], true);
}

#[tokio::test]
async fn test_ingest_rejects_unknown_kind() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_empty("/api/v1/ingest?source=PLcrate&kind=album")
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture.post_empty("/api/v1/ingest?kind=playlist").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_process_rejects_min_score_over_100() {
    let fixture = TestFixture::new().await;
    let response = fixture.post_empty("/api/v1/process?min_score=101").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pipeline_routes_unavailable_without_pipeline() {
    let fixture = TestFixture::with_config(TestConfig {
        without_pipeline: true,
        ..Default::default()
    })
    .await;

    for path in ["/api/v1/ingest", "/api/v1/enrich", "/api/v1/discover"] {
        let response = fixture.post_empty(path).await;
        assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
    }
    let response = fixture.get("/api/v1/stats").await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Feedback
// =============================================================================

#[tokio::test]
async fn test_report_penalizes_channel() {
    let fixture = TestFixture::with_config(TestConfig::with_scorer(scorer())).await;
    seed_playlist(&fixture).await;
    fixture.post_empty("/api/v1/ingest?source=PLcrate").await;
    fixture.post_empty("/api/v1/run-batch").await;

    let response = fixture
        .post(
            "/api/v1/report",
            json!({ "external_id": A, "reason": "off-genre" }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["outcome"], "penalized");
    assert_eq!(response.body["channel_id"], "UCone");
    assert_eq!(response.body["skip_count"], 1);
    assert!(response.body["reputation"].as_f64().unwrap() < 0.5);

    let stats = fixture.get("/api/v1/stats").await;
    assert_eq!(stats.body["catalog"]["reports"], 1);
}

#[tokio::test]
async fn test_report_unknown_sample_is_404() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v1/report", json!({ "external_id": "ZZZZZZZZZZZ" }))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_malformed_id_is_400() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/v1/report", json!({ "external_id": "bad" }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_report_behind_shared_secret() {
    let fixture = TestFixture::with_config(TestConfig {
        scorer: Some(scorer()),
        secret: Some("hunter2".to_string()),
        ..Default::default()
    })
    .await;
    seed_playlist(&fixture).await;
    fixture
        .post_empty("/api/v1/ingest?source=PLcrate&secret=hunter2")
        .await;
    fixture.post_empty("/api/v1/run-batch?secret=hunter2").await;

    let body = json!({ "external_id": C, "reason": "wrong era" });
    let response = fixture.post("/api/v1/report", body.clone()).await;
    assert_status!(response, StatusCode::UNAUTHORIZED);

    let response = fixture.post("/api/v1/report?secret=hunter2", body).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["outcome"], "penalized");
    assert_eq!(response.body["channel_id"], "UCtwo");
}

// =============================================================================
// Search crawl
// =============================================================================

async fn crawl_fixture() -> TestFixture {
    let fixture = TestFixture::with_config(TestConfig {
        crawl_queries: vec!["rare funk".to_string()],
        ..Default::default()
    })
    .await;
    fixture
        .api
        .add_search_items(
            "rare funk",
            vec![
                vec![fixtures::item_summary(A, "Rare funk 45 from 1974")],
                vec![fixtures::item_summary(B, "Obscure funk breaks")],
            ],
        )
        .await;
    fixture
}

#[tokio::test]
async fn test_discover_resumes_and_finishes() {
    let fixture = crawl_fixture().await;

    let response = fixture.post_empty("/api/v1/discover?max_pages=1").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["pages_fetched"], 1);
    assert_eq!(response.body["added"], 1);
    assert_eq!(response.body["finished"], false);
    assert_eq!(response.body["stopped_by"], "page_cap");

    let state = fixture.get("/api/v1/discover/state").await;
    assert_status!(state, StatusCode::OK);
    assert_eq!(state.body["crawl"], "search");
    assert_eq!(state.body["queries"], 1);
    assert_eq!(state.body["state"]["page_cursor"], "page-1");

    let response = fixture.post_empty("/api/v1/discover").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["pages_fetched"], 1);
    assert_eq!(response.body["added"], 1);
    assert_eq!(response.body["finished"], true);
    assert_eq!(response.body["stopped_by"], "finished");

    // Each page fetched exactly once across both runs
    assert_eq!(
        fixture.api.search_tokens("rare funk").await,
        vec![None, Some("page-1".to_string())]
    );

    let state = fixture.get("/api/v1/discover/state").await;
    assert!(state.body["state"].is_null());
}

#[tokio::test]
async fn test_discover_state_can_be_cleared() {
    let fixture = crawl_fixture().await;
    fixture.post_empty("/api/v1/discover?max_pages=1").await;

    let response = fixture.delete("/api/v1/discover/state").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["cleared"], true);

    let response = fixture.delete("/api/v1/discover/state").await;
    assert_eq!(response.body["cleared"], false);

    // Starts over from the first page
    let response = fixture.post_empty("/api/v1/discover?max_pages=1").await;
    assert_eq!(response.body["added"], 0);
    assert_eq!(response.body["skipped"], 1);
}

#[tokio::test]
async fn test_discover_quota_is_429_and_keeps_cursor() {
    let fixture = crawl_fixture().await;
    fixture
        .api
        .fail_after(ApiOperation::Search, 1, MockFailure::Quota)
        .await;

    let response = fixture.post_empty("/api/v1/discover").await;
    assert_status!(response, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["quota_exceeded"], true);

    let state = fixture.get("/api/v1/discover/state").await;
    assert_eq!(state.body["state"]["page_cursor"], "page-1");
}

// =============================================================================
// Observability
// =============================================================================

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let (status, text) = fixture.get_text("/api/v1/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("cratedigger_http_requests_total"));
    assert!(text.contains("cratedigger_candidates_by_stage"));
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/stats").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["candidates"]["total"], 0);
    assert_eq!(response.body["catalog"]["samples"], 0);
    assert!(response.body["catalog"]["average_reputation"].is_null());
    assert!(response.body.get("scheduler").is_none());
}
