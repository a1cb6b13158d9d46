//! Types for the media pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidate::CandidateSource;
use crate::fetch::FetchError;
use crate::storage::StoreError;

/// Errors that stop a pipeline stage.
///
/// Per-item and per-page failures are counted in stage reports instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every API key is out of quota; the stage stopped after saving what it had.
    #[error("API quota exceeded")]
    QuotaExceeded,

    #[error("fetch error: {0}")]
    Fetch(FetchError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<FetchError> for PipelineError {
    fn from(e: FetchError) -> Self {
        if e.is_quota() {
            PipelineError::QuotaExceeded
        } else {
            PipelineError::Fetch(e)
        }
    }
}

/// What to ingest from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum IngestTarget {
    Playlist(String),
    Channel(String),
    Search(String),
}

impl IngestTarget {
    /// Infer the target kind from an ID: channel IDs are `UC` followed by
    /// 22 characters; anything else is treated as a playlist.
    pub fn infer(id: &str) -> Self {
        let id = id.trim();
        if id.len() == 24 && id.starts_with("UC") {
            IngestTarget::Channel(id.to_string())
        } else {
            IngestTarget::Playlist(id.to_string())
        }
    }

    /// Build a target from an explicit kind string.
    pub fn from_kind(kind: &str, id: &str) -> Result<Self, PipelineError> {
        let id = id.trim().to_string();
        if id.is_empty() {
            return Err(PipelineError::InvalidInput("source must not be empty".to_string()));
        }
        match kind {
            "playlist" => Ok(IngestTarget::Playlist(id)),
            "channel" => Ok(IngestTarget::Channel(id)),
            "search" => Ok(IngestTarget::Search(id)),
            other => Err(PipelineError::InvalidInput(format!(
                "unknown source kind '{}' (expected playlist, channel or search)",
                other
            ))),
        }
    }

    pub fn source(&self) -> CandidateSource {
        match self {
            IngestTarget::Playlist(_) => CandidateSource::Playlist,
            IngestTarget::Channel(_) => CandidateSource::Channel,
            IngestTarget::Search(_) => CandidateSource::Search,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            IngestTarget::Playlist(id) | IngestTarget::Channel(id) | IngestTarget::Search(id) => id,
        }
    }
}

/// Outcome of an ingest call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub added: u32,
    /// Dedup hits only.
    pub skipped: u32,
    /// IDs that failed the external ID shape check.
    pub invalid: u32,
    /// Listing failure that cut discovery short (items before it were kept).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.added += other.added;
        self.skipped += other.skipped;
        self.invalid += other.invalid;
        if let Some(e) = other.error {
            self.error = Some(match self.error.take() {
                Some(prev) => format!("{}; {}", prev, e),
                None => e,
            });
        }
    }
}

/// Outcome of an enrich call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichReport {
    /// Candidates stamped as enriched (including `missing`).
    pub enriched: u32,
    /// Candidates the API no longer knows; enriched with empty metadata.
    pub missing: u32,
    /// Details batches that failed and were skipped.
    pub failed_batches: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub scored: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub promoted: u32,
    pub failed: u32,
}

/// Outcome of a combined enrich, score and process run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub enriched: u32,
    pub scored: u32,
    pub promoted: u32,
    pub failed: u32,
    /// Enrichment stopped on quota; scoring and processing still ran.
    pub quota_exhausted: bool,
}

/// Per-invocation limits for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub enrich: u32,
    pub score: u32,
    pub process: u32,
}
