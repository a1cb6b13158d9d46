//! Scoring stage.

use std::collections::HashMap;

use tracing::info;

use super::{record_stage_result, Pipeline, PipelineError, ScoreReport};
use crate::candidate::Candidate;
use crate::catalog::DEFAULT_REPUTATION;
use crate::metrics::{CANDIDATES_SCORED, STAGE_DURATION};

impl Pipeline {
    /// Score up to `limit` enriched, unprocessed candidates that have no
    /// score yet.
    pub fn score(&self, limit: u32) -> Result<ScoreReport, PipelineError> {
        let _timer = STAGE_DURATION.with_label_values(&["score"]).start_timer();
        let result = self
            .candidates
            .list_unscored(limit.min(self.config.max_limit))
            .map_err(PipelineError::from)
            .and_then(|pending| self.score_all(&pending));
        record_stage_result("score", &result);
        result
    }

    /// Re-score up to `limit` enriched, unprocessed candidates that already
    /// have a score, e.g. after channel reputations changed.
    pub fn rescore(&self, limit: u32) -> Result<ScoreReport, PipelineError> {
        let _timer = STAGE_DURATION.with_label_values(&["score"]).start_timer();
        let result = self
            .candidates
            .list_scored_unprocessed(limit.min(self.config.max_limit))
            .map_err(PipelineError::from)
            .and_then(|pending| self.score_all(&pending));
        record_stage_result("score", &result);
        result
    }

    fn score_all(&self, pending: &[Candidate]) -> Result<ScoreReport, PipelineError> {
        let mut reputations: HashMap<String, f64> = HashMap::new();
        let mut report = ScoreReport::default();

        for candidate in pending {
            let reputation = match &candidate.channel_id {
                Some(channel_id) => match reputations.get(channel_id) {
                    Some(r) => *r,
                    None => {
                        let r = self
                            .catalog
                            .get_channel(channel_id)?
                            .map(|c| c.reputation)
                            .unwrap_or(DEFAULT_REPUTATION);
                        reputations.insert(channel_id.clone(), r);
                        r
                    }
                },
                None => DEFAULT_REPUTATION,
            };

            let score = self.scorer.score(candidate, reputation);
            if self.candidates.set_score(&candidate.external_id, score)? {
                report.scored += 1;
            }
        }

        CANDIDATES_SCORED.inc_by(report.scored as u64);
        if report.scored > 0 {
            info!("Scored {} candidate(s) with {}", report.scored, self.scorer.name());
        }
        Ok(report)
    }
}
