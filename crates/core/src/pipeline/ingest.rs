//! Ingestion: dedup discovered items and stage them as candidates.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::{record_stage_result, IngestReport, IngestTarget, Pipeline, PipelineError};
use crate::candidate::{is_valid_external_id, CandidateSource, NewCandidate};
use crate::media_api::ItemSummary;
use crate::metrics::{CANDIDATES_INGESTED, STAGE_DURATION};

impl Pipeline {
    /// Discover up to `max_items` items from `target` and stage the new ones.
    ///
    /// Items already staged or already in the catalog are skipped. If
    /// discovery fails part-way the items found before the failure are
    /// still staged; a quota failure is then returned as an error, any
    /// other failure is reported in [`IngestReport::error`].
    pub async fn ingest(
        &self,
        target: &IngestTarget,
        max_items: Option<u32>,
    ) -> Result<IngestReport, PipelineError> {
        let _timer = STAGE_DURATION.with_label_values(&["ingest"]).start_timer();
        let result = self.ingest_inner(target, max_items).await;
        record_stage_result("ingest", &result);
        result
    }

    async fn ingest_inner(
        &self,
        target: &IngestTarget,
        max_items: Option<u32>,
    ) -> Result<IngestReport, PipelineError> {
        let max_items = max_items
            .unwrap_or(self.ingestion.max_items)
            .min(self.ingestion.max_items);

        let discovered = match target {
            IngestTarget::Playlist(id) => {
                self.discovery.list_items_from_container(id, max_items).await
            }
            IngestTarget::Channel(id) => self.discovery.list_items_from_source(id, max_items).await,
            IngestTarget::Search(query) => self.discovery.search_by_query(query, max_items).await,
        };

        let mut report =
            self.stage_items(&discovered.items, target.source(), Some(target.id()))?;

        info!(
            "Ingested {:?}: added={}, skipped={}, invalid={}",
            target, report.added, report.skipped, report.invalid
        );

        match discovered.error {
            Some(e) if e.is_quota() => Err(PipelineError::QuotaExceeded),
            Some(e) => {
                report.error = Some(e.to_string());
                Ok(report)
            }
            None => Ok(report),
        }
    }

    /// Ingest every configured default container.
    ///
    /// Stops at the first quota failure; other per-container failures are
    /// folded into the aggregated report.
    pub async fn ingest_defaults(
        &self,
        max_items: Option<u32>,
    ) -> Result<IngestReport, PipelineError> {
        let mut total = IngestReport::default();

        for id in &self.ingestion.default_containers {
            let target = IngestTarget::infer(id);
            match self.ingest(&target, max_items).await {
                Ok(report) => total.merge(report),
                Err(PipelineError::QuotaExceeded) => return Err(PipelineError::QuotaExceeded),
                Err(e) => {
                    warn!("Default ingest of {} failed: {}", id, e);
                    total.merge(IngestReport {
                        error: Some(format!("{}: {}", id, e)),
                        ..Default::default()
                    });
                }
            }
        }

        Ok(total)
    }

    /// Stage discovered items as candidates, skipping known IDs.
    ///
    /// An ID repeated within `items` is added once and then counted as
    /// skipped.
    pub(crate) fn stage_items(
        &self,
        items: &[ItemSummary],
        source: CandidateSource,
        source_ref: Option<&str>,
    ) -> Result<IngestReport, PipelineError> {
        let mut report = IngestReport::default();
        let mut seen = HashSet::new();
        let mut fresh: Vec<&ItemSummary> = Vec::new();

        for item in items {
            if !is_valid_external_id(&item.external_id) {
                debug!("Rejecting malformed external id {:?}", item.external_id);
                report.invalid += 1;
            } else if !seen.insert(item.external_id.as_str()) {
                report.skipped += 1;
            } else {
                fresh.push(item);
            }
        }

        let ids: Vec<String> = fresh.iter().map(|i| i.external_id.clone()).collect();
        let mut known = self.candidates.existing_external_ids(&ids)?;
        known.extend(self.catalog.existing_sample_ids(&ids)?);

        let new: Vec<NewCandidate> = fresh
            .into_iter()
            .filter(|item| !known.contains(&item.external_id))
            .map(|item| NewCandidate {
                external_id: item.external_id.clone(),
                source,
                source_ref: source_ref.map(String::from),
                title: item.title.clone(),
                channel_title: item.channel_title.clone(),
                channel_id: item.channel_id.clone(),
                thumbnail_url: item.thumbnail_url.clone(),
                description: item.description.clone(),
            })
            .collect();

        let inserted = self.candidates.insert_many(&new)? as u32;
        // Rows lost to a concurrent writer between the check and the insert
        // are dedup hits too.
        report.added = inserted;
        report.skipped += known.len() as u32 + (new.len() as u32 - inserted);

        CANDIDATES_INGESTED
            .with_label_values(&[source.as_str()])
            .inc_by(inserted as u64);

        Ok(report)
    }
}
