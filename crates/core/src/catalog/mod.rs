//! Catalog: promoted samples and the channel reputation ledger.
//!
//! Samples are keyed by external ID and only ever upserted. Channels are
//! created on first promotion through [`CatalogStore::get_or_create_channel`],
//! which recovers from a concurrent insert by re-reading the winner's row.

mod reputation;
mod sqlite;
mod types;

pub use reputation::{ReputationPolicy, DEFAULT_REPUTATION};
pub use sqlite::SqliteCatalogStore;
pub use types::*;

use std::collections::HashSet;

use crate::storage::{self, StoreError};

/// Trait for catalog storage.
pub trait CatalogStore: Send + Sync {
    fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, StoreError>;

    /// Insert a channel at the default reputation.
    ///
    /// Fails with [`StoreError::Duplicate`] if the channel already exists.
    fn insert_channel(&self, channel: &NewChannel) -> Result<Channel, StoreError>;

    /// Get a channel, creating it if absent.
    fn get_or_create_channel(&self, channel: &NewChannel) -> Result<Channel, StoreError> {
        storage::get_or_create(
            || self.get_channel(&channel.channel_id),
            || self.insert_channel(channel),
        )
    }

    /// Which of `ids` are already in the catalog.
    fn existing_sample_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError>;

    fn get_sample(&self, external_id: &str) -> Result<Option<Sample>, StoreError>;

    /// Most recently added samples first.
    fn list_samples(&self, limit: u32) -> Result<Vec<Sample>, StoreError>;

    /// Insert or update a sample by external ID.
    ///
    /// On creation the owning channel's `sample_count` is incremented in the
    /// same transaction.
    fn upsert_sample(&self, sample: &SampleUpsert) -> Result<UpsertOutcome, StoreError>;

    /// Record a report against a sample and penalize its channel.
    ///
    /// Fails with [`StoreError::NotFound`] for an unknown sample.
    fn apply_report(
        &self,
        external_id: &str,
        reason: &str,
        policy: &ReputationPolicy,
    ) -> Result<ReportOutcome, StoreError>;

    fn stats(&self) -> Result<CatalogStats, StoreError>;
}
