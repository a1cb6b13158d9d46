//! Enrichment: batched metadata backfill for staged candidates.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{record_stage_result, EnrichReport, Pipeline, PipelineError};
use crate::candidate::CandidateMetadata;
use crate::media_api::{ItemDetails, MAX_PAGE_SIZE};
use crate::metrics::{CANDIDATES_ENRICHED, STAGE_DURATION};

impl From<ItemDetails> for CandidateMetadata {
    fn from(d: ItemDetails) -> Self {
        CandidateMetadata {
            title: d.title,
            channel_title: d.channel_title,
            channel_id: d.channel_id,
            thumbnail_url: d.thumbnail_url,
            description: d.description,
            tags: d.tags,
            duration_seconds: d.duration_seconds,
        }
    }
}

impl Pipeline {
    /// Enrich up to `limit` unenriched candidates.
    ///
    /// Candidates the API does not return are stamped enriched with empty
    /// metadata so they are never fetched again. A failed batch is counted
    /// and skipped. Quota exhaustion stops the stage with an error; batches
    /// written before it are kept.
    pub async fn enrich(&self, limit: u32) -> Result<EnrichReport, PipelineError> {
        let _timer = STAGE_DURATION.with_label_values(&["enrich"]).start_timer();
        let result = self.enrich_inner(limit).await;
        record_stage_result("enrich", &result);
        result
    }

    async fn enrich_inner(&self, limit: u32) -> Result<EnrichReport, PipelineError> {
        let limit = limit.min(self.config.max_limit);
        let pending = self.candidates.list_unenriched(limit)?;
        let mut report = EnrichReport::default();

        if pending.is_empty() {
            return Ok(report);
        }

        let batch_size = self.config.enrich_batch_size.clamp(1, MAX_PAGE_SIZE) as usize;
        let delay = Duration::from_millis(self.config.batch_delay_ms);

        for (index, batch) in pending.chunks(batch_size).enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let ids: Vec<String> = batch.iter().map(|c| c.external_id.clone()).collect();
            let details = match self.api.item_details(&ids).await {
                Ok(details) => details,
                Err(e) if e.is_quota() => {
                    warn!(
                        "Enrichment stopped on quota after {} candidate(s)",
                        report.enriched
                    );
                    return Err(PipelineError::QuotaExceeded);
                }
                Err(e) => {
                    warn!("Details batch {} failed: {}", index + 1, e);
                    report.failed_batches += 1;
                    continue;
                }
            };

            let mut by_id: HashMap<String, ItemDetails> = details
                .into_iter()
                .map(|d| (d.external_id.clone(), d))
                .collect();

            for candidate in batch {
                let metadata = match by_id.remove(&candidate.external_id) {
                    Some(details) => CandidateMetadata::from(details),
                    None => CandidateMetadata::default(),
                };
                let incomplete = metadata.title.is_none()
                    || metadata.channel_id.is_none()
                    || metadata.thumbnail_url.is_none();

                if self
                    .candidates
                    .mark_enriched(&candidate.external_id, &metadata)?
                {
                    report.enriched += 1;
                    CANDIDATES_ENRICHED.inc();
                    if incomplete {
                        debug!("{} is incomplete upstream", candidate.external_id);
                        report.missing += 1;
                    }
                }
            }
        }

        info!(
            "Enriched {} candidate(s) ({} missing upstream, {} failed batch(es))",
            report.enriched, report.missing, report.failed_batches
        );
        Ok(report)
    }
}
