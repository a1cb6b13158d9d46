//! Quality scoring for enriched candidates.

mod heuristic;

pub use heuristic::{has_keyword_signal, HeuristicScorer};

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;

/// Genre and era labels derived from a candidate's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub genre: Option<String>,
    pub era: Option<String>,
}

/// Scores a candidate from 0 to 100.
///
/// Implementations must be pure: the same candidate and reputation always
/// yield the same score.
pub trait Scorer: Send + Sync {
    fn score(&self, candidate: &Candidate, channel_reputation: f64) -> u8;

    /// Labels stored on the catalog entry at promotion time.
    fn classify(&self, _candidate: &Candidate) -> Classification {
        Classification::default()
    }

    fn name(&self) -> &str;
}
