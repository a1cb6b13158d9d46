//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// Limits and thresholds for the enrich, score and process stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum quality score (0-100) for promotion.
    #[serde(default = "default_min_score")]
    pub min_score: u8,

    /// Item IDs per details call (the API caps this at 50).
    #[serde(default = "default_enrich_batch_size")]
    pub enrich_batch_size: u32,

    /// Default candidates enriched per invocation.
    #[serde(default = "default_enrich_limit")]
    pub enrich_limit: u32,

    /// Default candidates scored per invocation.
    #[serde(default = "default_score_limit")]
    pub score_limit: u32,

    /// Default candidates processed per invocation.
    #[serde(default = "default_process_limit")]
    pub process_limit: u32,

    /// Upper bound for any caller-supplied limit.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Delay between details batches (milliseconds).
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,
}

fn default_min_score() -> u8 {
    55
}

fn default_enrich_batch_size() -> u32 {
    50
}

fn default_enrich_limit() -> u32 {
    200
}

fn default_score_limit() -> u32 {
    500
}

fn default_process_limit() -> u32 {
    100
}

fn default_max_limit() -> u32 {
    1000
}

fn default_batch_delay() -> u64 {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            enrich_batch_size: default_enrich_batch_size(),
            enrich_limit: default_enrich_limit(),
            score_limit: default_score_limit(),
            process_limit: default_process_limit(),
            max_limit: default_max_limit(),
            batch_delay_ms: default_batch_delay(),
        }
    }
}

impl PipelineConfig {
    /// Apply the configured ceiling to a caller-supplied limit, falling back
    /// to `default` when none is given.
    pub fn clamp_limit(&self, requested: Option<u32>, default: u32) -> u32 {
        requested.unwrap_or(default).min(self.max_limit)
    }
}

/// Ingestion defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Playlist or channel IDs ingested by `ingest_defaults`.
    #[serde(default)]
    pub default_containers: Vec<String>,

    /// Default and maximum items listed per ingest call.
    #[serde(default = "default_max_items")]
    pub max_items: u32,

    /// Delay between container pages (milliseconds).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
}

fn default_max_items() -> u32 {
    200
}

fn default_page_delay() -> u64 {
    300
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            default_containers: Vec::new(),
            max_items: default_max_items(),
            page_delay_ms: default_page_delay(),
        }
    }
}
