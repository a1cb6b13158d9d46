//! Channel reputation feedback.

use tracing::info;

use super::{Pipeline, PipelineError};
use crate::candidate::is_valid_external_id;
use crate::catalog::ReportOutcome;
use crate::metrics::REPORTS;
use crate::storage::StoreError;

impl Pipeline {
    /// Report a promoted sample as a bad pick and penalize its channel.
    ///
    /// Returns [`ReportOutcome::ChannelUnknown`] when the sample has no
    /// channel to penalize, and a `NotFound` store error for an unknown
    /// sample.
    pub fn report(&self, external_id: &str, reason: &str) -> Result<ReportOutcome, PipelineError> {
        if !is_valid_external_id(external_id) {
            return Err(PipelineError::InvalidInput(format!(
                "malformed external id: {:?}",
                external_id
            )));
        }
        let reason = match reason.trim() {
            "" => "unspecified",
            r => r,
        };

        let outcome = match self
            .catalog
            .apply_report(external_id, reason, &self.reputation)
        {
            Ok(outcome) => outcome,
            Err(e @ StoreError::NotFound(_)) => {
                REPORTS.with_label_values(&["not_found"]).inc();
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        match &outcome {
            ReportOutcome::Penalized {
                channel_id,
                penalty,
                reputation,
                ..
            } => {
                REPORTS.with_label_values(&["penalized"]).inc();
                info!(
                    "Report on {} ({}): channel {} -{:.4} -> {:.4}",
                    external_id, reason, channel_id, penalty, reputation
                );
            }
            ReportOutcome::ChannelUnknown { .. } => {
                REPORTS.with_label_values(&["channel_unknown"]).inc();
                info!("Report on {} ({}): no channel to penalize", external_id, reason);
            }
        }

        Ok(outcome)
    }
}
