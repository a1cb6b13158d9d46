//! Catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reputation ledger entry for an upstream content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: String,
    pub name: String,
    /// Between 0.0 and 1.0.
    pub reputation: f64,
    pub skip_count: u32,
    /// Samples promoted from this channel.
    pub sample_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChannel {
    pub channel_id: String,
    pub name: String,
}

/// A promoted catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub external_id: String,
    pub title: String,
    /// Channel display name.
    pub channel: String,
    pub channel_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub genre: Option<String>,
    pub era: Option<String>,
    pub duration_seconds: Option<u32>,
    pub quality_score: Option<u8>,
    pub date_added: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-update payload for a sample, keyed by `external_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleUpsert {
    pub external_id: String,
    pub title: String,
    pub channel: String,
    pub channel_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub genre: Option<String>,
    pub era: Option<String>,
    pub duration_seconds: Option<u32>,
    pub quality_score: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Result of a feedback report against a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The sample's channel was penalized.
    Penalized {
        channel_id: String,
        penalty: f64,
        reputation: f64,
        skip_count: u32,
    },
    /// The sample has no resolvable channel; nothing to penalize.
    ChannelUnknown { external_id: String },
}

/// Catalog statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub samples: u64,
    pub channels: u64,
    pub reports: u64,
    /// Mean channel reputation; `None` when there are no channels.
    pub average_reputation: Option<f64>,
}
