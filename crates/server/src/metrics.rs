//! Prometheus metrics for observability.
//!
//! Server-side HTTP and auth metrics, plus dynamic gauges refreshed from the
//! stores and the quota client on every scrape. Pipeline metrics come from
//! `cratedigger_core::metrics` and share the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cratedigger_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cratedigger_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "cratedigger_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cratedigger_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// State gauges (collected dynamically)
// =============================================================================

/// Candidates by lifecycle stage.
pub static CANDIDATES_BY_STAGE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "cratedigger_candidates_by_stage",
            "Current candidate count by stage",
        ),
        &["stage"],
    )
    .unwrap()
});

pub static CATALOG_SAMPLES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("cratedigger_catalog_samples", "Samples in the catalog").unwrap()
});

/// API keys not yet marked exhausted.
pub static API_KEYS_AVAILABLE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "cratedigger_api_keys_available",
        "API keys with quota remaining",
    )
    .unwrap()
});

pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "cratedigger_scheduler_running",
        "Whether the batch scheduler is running (1) or not (0)",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // State
    registry
        .register(Box::new(CANDIDATES_BY_STAGE.clone()))
        .unwrap();
    registry
        .register(Box::new(CATALOG_SAMPLES.clone()))
        .unwrap();
    registry
        .register(Box::new(API_KEYS_AVAILABLE.clone()))
        .unwrap();
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();

    // Core metrics (media API, pipeline stages, crawl)
    for metric in cratedigger_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh gauges from the current application state.
pub fn collect_dynamic_metrics(state: &AppState) {
    if let Some(pipeline) = state.pipeline() {
        if let Ok(stats) = pipeline.candidates().stats() {
            for (stage, count) in [
                ("new", stats.new),
                ("enriched", stats.enriched),
                ("scored", stats.scored),
                ("promoted", stats.promoted),
            ] {
                CANDIDATES_BY_STAGE
                    .with_label_values(&[stage])
                    .set(count as i64);
            }
        }
        if let Ok(stats) = pipeline.catalog().stats() {
            CATALOG_SAMPLES.set(stats.samples as i64);
        }
    }

    if let Some(client) = state.quota_client() {
        API_KEYS_AVAILABLE.set(client.key_status().available as i64);
    }

    SCHEDULER_RUNNING.set(state.scheduler().is_some_and(|s| s.is_running()) as i64);
}
