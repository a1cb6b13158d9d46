//! Candidate types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of an external item ID.
pub const EXTERNAL_ID_LEN: usize = 11;

/// Whether `id` looks like an external item ID: 11 chars of `[A-Za-z0-9_-]`.
pub fn is_valid_external_id(id: &str) -> bool {
    id.len() == EXTERNAL_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Where a candidate was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Search,
    Playlist,
    Channel,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Search => "search",
            CandidateSource::Playlist => "playlist",
            CandidateSource::Channel => "channel",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(CandidateSource::Search),
            "playlist" => Ok(CandidateSource::Playlist),
            "channel" => Ok(CandidateSource::Channel),
            other => Err(format!("unknown candidate source: {}", other)),
        }
    }
}

/// Lifecycle stage, derived from which timestamps and score are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStage {
    New,
    Enriched,
    Scored,
    Promoted,
}

/// A staged media item awaiting enrichment, scoring and promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub external_id: String,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub channel_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration_seconds: Option<u32>,
    pub source: CandidateSource,
    /// Container ID or query the item was discovered from.
    pub source_ref: Option<String>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub quality_score: Option<u8>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn stage(&self) -> CandidateStage {
        if self.processed_at.is_some() {
            CandidateStage::Promoted
        } else if self.quality_score.is_some() {
            CandidateStage::Scored
        } else if self.enriched_at.is_some() {
            CandidateStage::Enriched
        } else {
            CandidateStage::New
        }
    }

    /// Whether the fields required to build a catalog entry are present.
    pub fn is_promotable_shape(&self) -> bool {
        self.title.is_some() && self.channel_id.is_some() && self.thumbnail_url.is_some()
    }
}

/// A candidate to insert at ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub external_id: String,
    pub source: CandidateSource,
    pub source_ref: Option<String>,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub channel_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
}

impl NewCandidate {
    pub fn new(external_id: impl Into<String>, source: CandidateSource) -> Self {
        Self {
            external_id: external_id.into(),
            source,
            source_ref: None,
            title: None,
            channel_title: None,
            channel_id: None,
            thumbnail_url: None,
            description: None,
        }
    }
}

/// Metadata written back by enrichment. All-`None` marks an item that is
/// missing upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateMetadata {
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub channel_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration_seconds: Option<u32>,
}

/// Candidate counts by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateStats {
    pub total: u64,
    pub new: u64,
    pub enriched: u64,
    pub scored: u64,
    pub promoted: u64,
}
