//! Pipeline, catalog and quota statistics.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use cratedigger_core::candidate::CandidateStats;
use cratedigger_core::catalog::CatalogStats;
use cratedigger_core::fetch::KeyStatus;
use cratedigger_core::scheduler::SchedulerStatus;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QuotaStats {
    pub keys: KeyStatus,
    /// Units spent since startup.
    pub units_spent: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub candidates: CandidateStats,
    pub catalog: CatalogStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerStatus>,
}

/// GET /api/v1/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let pipeline = state
        .pipeline()
        .ok_or_else(|| ApiError::unavailable("pipeline"))?;

    Ok(Json(StatsResponse {
        candidates: pipeline.candidates().stats()?,
        catalog: pipeline.catalog().stats()?,
        quota: state.quota_client().map(|client| QuotaStats {
            keys: client.key_status(),
            units_spent: client.units_spent(),
        }),
        scheduler: state.scheduler().map(|s| s.status()),
    }))
}
