//! Promotion of scored candidates into the catalog.

use tracing::{debug, info, warn};

use super::{record_stage_result, Pipeline, PipelineError, ProcessReport};
use crate::candidate::Candidate;
use crate::catalog::{NewChannel, SampleUpsert, UpsertOutcome};
use crate::metrics::{PROMOTIONS, STAGE_DURATION};

impl Pipeline {
    /// Promote up to `limit` candidates scoring at least `min_score`.
    ///
    /// A failure on one candidate is counted and the loop moves on; the
    /// candidate stays unprocessed and is retried on the next call.
    pub fn process(&self, limit: u32, min_score: u8) -> Result<ProcessReport, PipelineError> {
        let _timer = STAGE_DURATION.with_label_values(&["process"]).start_timer();
        let result = self
            .candidates
            .list_promotable(min_score.min(100), limit.min(self.config.max_limit))
            .map_err(PipelineError::from)
            .map(|ready| self.promote_all(&ready));
        record_stage_result("process", &result);
        result
    }

    fn promote_all(&self, ready: &[Candidate]) -> ProcessReport {
        let mut report = ProcessReport::default();

        for candidate in ready {
            match self.promote_one(candidate) {
                Ok(outcome) => {
                    debug!("Promoted {} ({:?})", candidate.external_id, outcome);
                    report.promoted += 1;
                    let label = match outcome {
                        UpsertOutcome::Created => "created",
                        UpsertOutcome::Updated => "updated",
                    };
                    PROMOTIONS.with_label_values(&[label]).inc();
                }
                Err(e) => {
                    warn!("Failed to promote {}: {}", candidate.external_id, e);
                    report.failed += 1;
                    PROMOTIONS.with_label_values(&["failed"]).inc();
                }
            }
        }

        if !ready.is_empty() {
            info!(
                "Processed {} candidate(s): promoted={}, failed={}",
                ready.len(),
                report.promoted,
                report.failed
            );
        }
        report
    }

    fn promote_one(&self, candidate: &Candidate) -> Result<UpsertOutcome, PipelineError> {
        let (Some(title), Some(channel_id)) = (&candidate.title, &candidate.channel_id) else {
            return Err(PipelineError::InvalidInput(format!(
                "{} lacks title or channel",
                candidate.external_id
            )));
        };
        let channel_name = candidate
            .channel_title
            .clone()
            .unwrap_or_else(|| channel_id.clone());

        self.catalog.get_or_create_channel(&NewChannel {
            channel_id: channel_id.clone(),
            name: channel_name.clone(),
        })?;

        let class = self.scorer.classify(candidate);
        let outcome = self.catalog.upsert_sample(&SampleUpsert {
            external_id: candidate.external_id.clone(),
            title: title.clone(),
            channel: channel_name,
            channel_id: Some(channel_id.clone()),
            thumbnail_url: candidate.thumbnail_url.clone(),
            genre: class.genre,
            era: class.era,
            duration_seconds: candidate.duration_seconds,
            quality_score: candidate.quality_score,
        })?;

        self.candidates.mark_processed(&candidate.external_id)?;
        Ok(outcome)
    }
}
