//! HTTP service for the cratedigger pipeline.

pub mod api;
pub mod metrics;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use cratedigger_core::{
    create_authenticator, Authenticator, BatchScheduler, CandidateStore, CatalogStore, Config,
    HeuristicScorer, MediaApi, Pipeline, QuotaAwareClient, SearchCrawler, SqliteCandidateStore,
    SqliteCatalogStore, SqliteCrawlStateStore, YouTubeClient,
};

use state::AppState;

/// Wire stores, clients and the pipeline from configuration.
///
/// The scheduler is created (when enabled) but not started.
pub fn build_state(config: Config) -> Result<AppState> {
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let db_path = &config.database.path;
    let candidates: Arc<dyn CandidateStore> = Arc::new(
        SqliteCandidateStore::new(db_path).context("Failed to create candidate store")?,
    );
    let catalog: Arc<dyn CatalogStore> = Arc::new(
        SqliteCatalogStore::new(db_path).context("Failed to create catalog store")?,
    );
    let crawl_state = Arc::new(
        SqliteCrawlStateStore::new(db_path).context("Failed to create crawl state store")?,
    );
    info!("Stores initialized at {:?}", db_path);

    let keys = config.api.key_list();
    if keys.is_empty() {
        warn!("No API keys configured; ingest, enrich and discover will answer 503");
    } else {
        info!("{} API key(s) configured", keys.len());
    }
    let quota_client = Arc::new(
        QuotaAwareClient::new(keys, Duration::from_secs(config.api.timeout_secs as u64))
            .context("Failed to create HTTP client")?,
    );
    let api: Arc<dyn MediaApi> = Arc::new(YouTubeClient::new(
        Arc::clone(&quota_client),
        config.api.base_url.clone(),
    ));
    info!("Media API backend: {}", api.name());

    let pipeline = Arc::new(
        Pipeline::new(candidates, catalog, api, Arc::new(HeuristicScorer::new()))
            .with_config(config.pipeline.clone())
            .with_ingestion(config.ingestion.clone())
            .with_reputation(config.reputation),
    );

    let crawler = Arc::new(SearchCrawler::new(
        Arc::clone(&pipeline),
        crawl_state,
        config.crawl.clone(),
    ));

    let scheduler = config.scheduler.enabled.then(|| {
        Arc::new(BatchScheduler::new(
            config.scheduler.clone(),
            Arc::clone(&pipeline),
        ))
    });

    let mut state = AppState::new(config, authenticator)
        .with_pipeline(pipeline)
        .with_crawler(crawler)
        .with_quota_client(quota_client);
    if let Some(scheduler) = scheduler {
        state = state.with_scheduler(scheduler);
    }
    Ok(state)
}
