//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Quota-metered API calls (units spent, key exhaustion)
//! - Pipeline stages (ingest, enrich, score, promote)
//! - Search crawler pages and feedback reports

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Media API Metrics
// =============================================================================

/// Quota units spent, by operation.
pub static API_QUOTA_UNITS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cratedigger_api_quota_units_total",
            "Quota units spent on the media API",
        ),
        &["operation"], // "search", "container_page", "source_lookup", "item_details"
    )
    .unwrap()
});

/// Media API requests, by operation and outcome.
pub static API_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cratedigger_api_requests_total", "Total media API requests"),
        &["operation", "status"], // status: "success", "error", "quota"
    )
    .unwrap()
});

/// Media API request duration.
pub static API_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cratedigger_api_request_duration_seconds",
            "Duration of media API calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// API keys marked exhausted since process start.
pub static API_KEYS_EXHAUSTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cratedigger_api_keys_exhausted_total",
        "API keys that ran out of quota",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Candidates inserted by ingestion, by source kind.
pub static CANDIDATES_INGESTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cratedigger_candidates_ingested_total",
            "Candidates inserted by ingestion",
        ),
        &["source"], // "search", "playlist", "channel"
    )
    .unwrap()
});

/// Candidates enriched with upstream metadata.
pub static CANDIDATES_ENRICHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cratedigger_candidates_enriched_total",
        "Candidates enriched with item details",
    )
    .unwrap()
});

/// Candidates scored.
pub static CANDIDATES_SCORED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("cratedigger_candidates_scored_total", "Candidates scored").unwrap()
});

/// Promotion outcomes.
pub static PROMOTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cratedigger_promotions_total", "Candidate promotion outcomes"),
        &["result"], // "created", "updated", "failed"
    )
    .unwrap()
});

/// Pipeline stage duration.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cratedigger_stage_duration_seconds",
            "Duration of pipeline stage invocations",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["stage"], // "ingest", "enrich", "score", "process", "batch", "crawl"
    )
    .unwrap()
});

/// Pipeline stage failures, by stage.
pub static STAGE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cratedigger_stage_failures_total",
            "Pipeline stage invocations that ended in an error",
        ),
        &["stage", "reason"], // reason: "quota", "error"
    )
    .unwrap()
});

// =============================================================================
// Crawl & Feedback Metrics
// =============================================================================

/// Search pages fetched by the crawler.
pub static CRAWL_PAGES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cratedigger_crawl_pages_total",
        "Search result pages fetched by the crawler",
    )
    .unwrap()
});

/// Feedback reports, by outcome.
pub static REPORTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cratedigger_reports_total", "Sample feedback reports"),
        &["result"], // "penalized", "channel_unknown", "not_found"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Media API
        Box::new(API_QUOTA_UNITS.clone()),
        Box::new(API_REQUESTS.clone()),
        Box::new(API_REQUEST_DURATION.clone()),
        Box::new(API_KEYS_EXHAUSTED.clone()),
        // Pipeline
        Box::new(CANDIDATES_INGESTED.clone()),
        Box::new(CANDIDATES_ENRICHED.clone()),
        Box::new(CANDIDATES_SCORED.clone()),
        Box::new(PROMOTIONS.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(STAGE_FAILURES.clone()),
        // Crawl & feedback
        Box::new(CRAWL_PAGES.clone()),
        Box::new(REPORTS.clone()),
    ]
}
