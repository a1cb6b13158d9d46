//! Search crawl handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use cratedigger_core::crawl::{CrawlOptions, CrawlReport, CrawlState, SearchCrawler};

use super::error::ApiError;
use super::pipeline::require_api_keys;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Debug, Serialize)]
pub struct CrawlStateResponse {
    pub crawl: String,
    pub queries: usize,
    pub state: Option<CrawlState>,
}

#[derive(Debug, Serialize)]
pub struct ClearStateResponse {
    pub cleared: bool,
}

fn crawler(state: &AppState) -> Result<&Arc<SearchCrawler>, ApiError> {
    state
        .crawler()
        .ok_or_else(|| ApiError::unavailable("crawler"))
}

/// POST /api/v1/discover
///
/// Run the search crawl from its saved cursor. Returns 409 while another
/// crawl is in progress.
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverParams>,
) -> Result<Json<CrawlReport>, ApiError> {
    let crawler = crawler(&state)?;
    require_api_keys(&state)?;
    let report = crawler
        .run(CrawlOptions {
            max_pages: params.max_pages,
            fresh: params.fresh,
        })
        .await?;
    Ok(Json(report))
}

/// GET /api/v1/discover/state
pub async fn get_state(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CrawlStateResponse>, ApiError> {
    let crawler = crawler(&state)?;
    Ok(Json(CrawlStateResponse {
        crawl: crawler.config().name.clone(),
        queries: crawler.config().queries.len(),
        state: crawler.state()?,
    }))
}

/// DELETE /api/v1/discover/state
pub async fn clear_state(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearStateResponse>, ApiError> {
    let crawler = crawler(&state)?;
    Ok(Json(ClearStateResponse {
        cleared: crawler.reset()?,
    }))
}
