//! Channel reputation policy.

use serde::{Deserialize, Serialize};

/// Reputation a channel starts with.
pub const DEFAULT_REPUTATION: f64 = 0.5;

/// Penalty applied when a sample is reported.
///
/// `penalty = base_penalty / (1 + sample_count * damping_factor)`, so a
/// channel with a long track record loses less per report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationPolicy {
    #[serde(default = "default_base_penalty")]
    pub base_penalty: f64,
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f64,
}

fn default_base_penalty() -> f64 {
    0.05
}

fn default_damping_factor() -> f64 {
    0.1
}

impl Default for ReputationPolicy {
    fn default() -> Self {
        Self {
            base_penalty: default_base_penalty(),
            damping_factor: default_damping_factor(),
        }
    }
}

impl ReputationPolicy {
    pub fn penalty(&self, sample_count: u32) -> f64 {
        self.base_penalty / (1.0 + sample_count as f64 * self.damping_factor)
    }

    /// New reputation after one report, clamped to `[0.0, 1.0]`.
    pub fn apply(&self, reputation: f64, sample_count: u32) -> f64 {
        (reputation - self.penalty(sample_count)).clamp(0.0, 1.0)
    }
}
