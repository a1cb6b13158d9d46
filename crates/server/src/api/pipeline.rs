//! Pipeline stage handlers.
//!
//! Every stage is bounded by a caller-supplied limit clamped to the
//! configured maximum, and safe to call repeatedly.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use cratedigger_core::catalog::ReportOutcome;
use cratedigger_core::pipeline::{
    BatchLimits, BatchReport, EnrichReport, IngestReport, IngestTarget, ProcessReport,
    ScoreReport,
};
use cratedigger_core::Pipeline;

use super::error::ApiError;
use super::middleware::AuthCaller;
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IngestParams {
    /// Playlist ID, channel ID or search query. Omitted: ingest the
    /// configured default containers.
    #[serde(default)]
    pub source: Option<String>,
    /// `playlist`, `channel` or `search`. Omitted: inferred from the ID.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub max_items: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreParams {
    #[serde(default)]
    pub limit: Option<u32>,
    /// Recompute scores of scored, unpromoted candidates.
    #[serde(default)]
    pub rescore: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProcessParams {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub min_score: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct BatchParams {
    #[serde(default)]
    pub enrich_limit: Option<u32>,
    #[serde(default)]
    pub score_limit: Option<u32>,
    #[serde(default)]
    pub process_limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub external_id: String,
    #[serde(default)]
    pub reason: String,
}

fn pipeline(state: &AppState) -> Result<&Arc<Pipeline>, ApiError> {
    state
        .pipeline()
        .ok_or_else(|| ApiError::unavailable("pipeline"))
}

/// Refuse metered work when the outbound client holds no API keys.
pub(super) fn require_api_keys(state: &AppState) -> Result<(), ApiError> {
    match state.quota_client() {
        Some(client) if client.key_status().total == 0 => {
            Err(ApiError::unavailable("media API keys"))
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/ingest
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IngestParams>,
) -> Result<Json<IngestReport>, ApiError> {
    let pipeline = pipeline(&state)?;
    require_api_keys(&state)?;

    let source = params.source.as_deref().map(str::trim).unwrap_or_default();
    let report = if source.is_empty() {
        if params.kind.is_some() {
            return Err(ApiError::bad_request("kind given without source"));
        }
        pipeline.ingest_defaults(params.max_items).await?
    } else {
        let target = match params.kind.as_deref() {
            Some(kind) => IngestTarget::from_kind(kind, source)?,
            None => IngestTarget::infer(source),
        };
        pipeline.ingest(&target, params.max_items).await?
    };

    Ok(Json(report))
}

/// POST /api/v1/enrich
pub async fn enrich(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<EnrichReport>, ApiError> {
    let pipeline = pipeline(&state)?;
    require_api_keys(&state)?;
    let config = pipeline.config();
    let limit = config.clamp_limit(params.limit, config.enrich_limit);
    Ok(Json(pipeline.enrich(limit).await?))
}

/// POST /api/v1/score
pub async fn score(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScoreParams>,
) -> Result<Json<ScoreReport>, ApiError> {
    let pipeline = pipeline(&state)?;
    let config = pipeline.config();
    let limit = config.clamp_limit(params.limit, config.score_limit);
    let report = if params.rescore {
        pipeline.rescore(limit)?
    } else {
        pipeline.score(limit)?
    };
    Ok(Json(report))
}

/// POST /api/v1/process
pub async fn process(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProcessParams>,
) -> Result<Json<ProcessReport>, ApiError> {
    let pipeline = pipeline(&state)?;
    let config = pipeline.config();
    let limit = config.clamp_limit(params.limit, config.process_limit);
    let min_score = params.min_score.unwrap_or(config.min_score);
    if min_score > 100 {
        return Err(ApiError::bad_request("min_score must be between 0 and 100"));
    }
    Ok(Json(pipeline.process(limit, min_score)?))
}

/// POST /api/v1/run-batch
pub async fn run_batch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BatchParams>,
) -> Result<Json<BatchReport>, ApiError> {
    let pipeline = pipeline(&state)?;
    let config = pipeline.config();
    let limits = BatchLimits {
        enrich: config.clamp_limit(params.enrich_limit, config.enrich_limit),
        score: config.clamp_limit(params.score_limit, config.score_limit),
        process: config.clamp_limit(params.process_limit, config.process_limit),
    };
    Ok(Json(pipeline.run_batch(limits).await?))
}

/// POST /api/v1/report
///
/// Flag a promoted sample as a bad pick and penalize its channel.
pub async fn report(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ReportOutcome>, ApiError> {
    let pipeline = pipeline(&state)?;
    let external_id = request.external_id.trim();
    let outcome = pipeline.report(external_id, &request.reason)?;
    info!("Report on {} accepted from {}", external_id, caller);
    Ok(Json(outcome))
}
