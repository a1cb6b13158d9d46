//! Ingest, enrich, score and promote pipeline.
//!
//! Each stage is an independent, bounded, idempotent operation over the
//! candidate store:
//!
//! ```text
//! discovery ─► ingest ─► enrich ─► score ─► process ─► catalog
//!                (new)   (enriched) (scored)  (promoted)
//! ```
//!
//! Only quota exhaustion and unexpected store failures stop a stage. Page,
//! batch and item failures are counted in the stage report and skipped.

mod config;
mod enrich;
mod feedback;
mod ingest;
mod promote;
mod score;
mod types;

pub use config::{IngestionConfig, PipelineConfig};
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::candidate::CandidateStore;
use crate::catalog::{CatalogStore, ReputationPolicy};
use crate::discovery::Discovery;
use crate::media_api::MediaApi;
use crate::metrics::{STAGE_DURATION, STAGE_FAILURES};
use crate::scorer::Scorer;

/// The media pipeline and its collaborators.
pub struct Pipeline {
    candidates: Arc<dyn CandidateStore>,
    catalog: Arc<dyn CatalogStore>,
    api: Arc<dyn MediaApi>,
    discovery: Discovery,
    scorer: Arc<dyn Scorer>,
    config: PipelineConfig,
    ingestion: IngestionConfig,
    reputation: ReputationPolicy,
}

impl Pipeline {
    /// Create a pipeline with default configuration.
    pub fn new(
        candidates: Arc<dyn CandidateStore>,
        catalog: Arc<dyn CatalogStore>,
        api: Arc<dyn MediaApi>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        let ingestion = IngestionConfig::default();
        let discovery = Discovery::new(
            Arc::clone(&api),
            Duration::from_millis(ingestion.page_delay_ms),
        );
        Self {
            candidates,
            catalog,
            api,
            discovery,
            scorer,
            config: PipelineConfig::default(),
            ingestion,
            reputation: ReputationPolicy::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ingestion(mut self, ingestion: IngestionConfig) -> Self {
        self.discovery = Discovery::new(
            Arc::clone(&self.api),
            Duration::from_millis(ingestion.page_delay_ms),
        );
        self.ingestion = ingestion;
        self
    }

    pub fn with_reputation(mut self, reputation: ReputationPolicy) -> Self {
        self.reputation = reputation;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ingestion_config(&self) -> &IngestionConfig {
        &self.ingestion
    }

    pub fn candidates(&self) -> &Arc<dyn CandidateStore> {
        &self.candidates
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    pub fn scorer(&self) -> &Arc<dyn Scorer> {
        &self.scorer
    }

    pub fn api(&self) -> &Arc<dyn MediaApi> {
        &self.api
    }

    /// Configured limits, each capped at `max_limit`.
    pub fn default_limits(&self) -> BatchLimits {
        BatchLimits {
            enrich: self.config.clamp_limit(None, self.config.enrich_limit),
            score: self.config.clamp_limit(None, self.config.score_limit),
            process: self.config.clamp_limit(None, self.config.process_limit),
        }
    }

    /// Run enrich, score and process once, each bounded by its own limit.
    ///
    /// Quota exhaustion during enrichment does not stop the batch: scoring
    /// and processing spend no quota and still run over whatever is ready.
    pub async fn run_batch(&self, limits: BatchLimits) -> Result<BatchReport, PipelineError> {
        let _timer = STAGE_DURATION.with_label_values(&["batch"]).start_timer();
        let mut report = BatchReport::default();

        match self.enrich(limits.enrich).await {
            Ok(enriched) => report.enriched = enriched.enriched,
            Err(PipelineError::QuotaExceeded) => {
                warn!("Enrichment stopped on quota; continuing with scoring");
                report.quota_exhausted = true;
            }
            Err(e) => return Err(e),
        }

        report.scored = self.score(limits.score)?.scored;

        let processed = self.process(limits.process, self.config.min_score)?;
        report.promoted = processed.promoted;
        report.failed = processed.failed;

        info!(
            "Batch complete: enriched={}, scored={}, promoted={}, failed={}, quota_exhausted={}",
            report.enriched, report.scored, report.promoted, report.failed, report.quota_exhausted
        );
        Ok(report)
    }
}

/// Record a stage-level failure metric for `result`.
fn record_stage_result<T>(stage: &str, result: &Result<T, PipelineError>) {
    if let Err(e) = result {
        let reason = match e {
            PipelineError::QuotaExceeded => "quota",
            _ => "error",
        };
        STAGE_FAILURES.with_label_values(&[stage, reason]).inc();
    }
}
