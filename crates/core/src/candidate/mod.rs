//! Candidate staging store.
//!
//! Candidates move `New -> Enriched -> Scored -> Promoted`. Each transition
//! is a single guarded UPDATE so a row is enriched once and processed once
//! even when stages overlap.

mod sqlite;
mod types;

pub use sqlite::SqliteCandidateStore;
pub use types::*;

use std::collections::HashSet;

use crate::storage::StoreError;

/// Trait for candidate storage.
pub trait CandidateStore: Send + Sync {
    /// Which of `ids` are already staged.
    fn existing_external_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Insert candidates, ignoring IDs that already exist.
    ///
    /// Returns the number of rows actually inserted.
    fn insert_many(&self, candidates: &[NewCandidate]) -> Result<usize, StoreError>;

    /// Get a candidate by external ID.
    fn get(&self, external_id: &str) -> Result<Option<Candidate>, StoreError>;

    /// Candidates never enriched, oldest first.
    fn list_unenriched(&self, limit: u32) -> Result<Vec<Candidate>, StoreError>;

    /// Write enrichment metadata and stamp `enriched_at`.
    ///
    /// Returns false if the candidate was already enriched.
    fn mark_enriched(
        &self,
        external_id: &str,
        metadata: &CandidateMetadata,
    ) -> Result<bool, StoreError>;

    /// Enriched, unprocessed candidates without a score.
    fn list_unscored(&self, limit: u32) -> Result<Vec<Candidate>, StoreError>;

    /// Enriched, unprocessed candidates that already have a score.
    fn list_scored_unprocessed(&self, limit: u32) -> Result<Vec<Candidate>, StoreError>;

    /// Set (or overwrite) the score of an unprocessed candidate.
    fn set_score(&self, external_id: &str, score: u8) -> Result<bool, StoreError>;

    /// Unprocessed candidates scoring at least `min_score` that carry a
    /// title, channel ID and thumbnail; highest score first.
    fn list_promotable(&self, min_score: u8, limit: u32) -> Result<Vec<Candidate>, StoreError>;

    /// Stamp `processed_at`. Returns false if it was already set.
    fn mark_processed(&self, external_id: &str) -> Result<bool, StoreError>;

    /// Counts by stage.
    fn stats(&self) -> Result<CandidateStats, StoreError>;
}
