//! Testing utilities and mock implementations.
//!
//! Mocks stand in for the metered media API and the scorer so pipeline
//! stages, the crawler and the HTTP layer can run without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use cratedigger_core::testing::{fixtures, FixedScorer, MockMediaApi};
//!
//! let api = MockMediaApi::new();
//! api.add_container("PL1", vec![vec!["AAAAAAAAAAA"]]).await;
//! api.add_details(fixtures::item_details("AAAAAAAAAAA", "Funk 45", "UCcrate")).await;
//!
//! let scorer = FixedScorer::new(60).with_score("AAAAAAAAAAA", 90);
//! ```

mod mock_media_api;

pub use mock_media_api::{MockFailure, MockMediaApi, RecordedApiCall};

use std::collections::HashMap;

use crate::candidate::Candidate;
use crate::scorer::Scorer;

/// Scorer returning preset scores, ignoring reputation.
#[derive(Debug, Clone, Default)]
pub struct FixedScorer {
    default: u8,
    scores: HashMap<String, u8>,
}

impl FixedScorer {
    pub fn new(default: u8) -> Self {
        Self {
            default,
            scores: HashMap::new(),
        }
    }

    pub fn with_score(mut self, external_id: &str, score: u8) -> Self {
        self.scores.insert(external_id.to_string(), score);
        self
    }
}

impl Scorer for FixedScorer {
    fn score(&self, candidate: &Candidate, _channel_reputation: f64) -> u8 {
        self.scores
            .get(&candidate.external_id)
            .copied()
            .unwrap_or(self.default)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::candidate::{Candidate, CandidateMetadata, CandidateSource, NewCandidate};
    use crate::catalog::SampleUpsert;
    use crate::media_api::{ItemDetails, ItemSummary};

    fn thumbnail(external_id: &str) -> String {
        format!("https://i.example.com/vi/{}/hqdefault.jpg", external_id)
    }

    /// A bare playlist candidate.
    pub fn new_candidate(external_id: &str) -> NewCandidate {
        NewCandidate::new(external_id, CandidateSource::Playlist)
    }

    /// A listing entry with a title and channel.
    pub fn item_summary(external_id: &str, title: &str) -> ItemSummary {
        ItemSummary {
            external_id: external_id.to_string(),
            title: Some(title.to_string()),
            channel_title: Some("Crate Channel".to_string()),
            channel_id: Some("UCcrate".to_string()),
            thumbnail_url: Some(thumbnail(external_id)),
            description: None,
        }
    }

    /// Complete details with a 200 second duration.
    pub fn item_details(external_id: &str, title: &str, channel_id: &str) -> ItemDetails {
        ItemDetails {
            external_id: external_id.to_string(),
            title: Some(title.to_string()),
            channel_title: Some(format!("Channel {}", channel_id)),
            channel_id: Some(channel_id.to_string()),
            thumbnail_url: Some(thumbnail(external_id)),
            description: None,
            tags: Vec::new(),
            duration_seconds: Some(200),
        }
    }

    /// Promotable enrichment metadata.
    pub fn metadata(title: &str, channel_id: &str) -> CandidateMetadata {
        CandidateMetadata {
            title: Some(title.to_string()),
            channel_title: Some(format!("Channel {}", channel_id)),
            channel_id: Some(channel_id.to_string()),
            thumbnail_url: Some("https://i.example.com/thumb.jpg".to_string()),
            description: None,
            tags: Vec::new(),
            duration_seconds: Some(200),
        }
    }

    /// An enriched, unscored candidate.
    pub fn enriched_candidate(external_id: &str, title: &str, channel_id: &str) -> Candidate {
        let meta = metadata(title, channel_id);
        let now = Utc::now();
        Candidate {
            external_id: external_id.to_string(),
            title: meta.title,
            channel_title: meta.channel_title,
            channel_id: meta.channel_id,
            thumbnail_url: Some(thumbnail(external_id)),
            description: meta.description,
            tags: meta.tags,
            duration_seconds: meta.duration_seconds,
            source: CandidateSource::Playlist,
            source_ref: None,
            enriched_at: Some(now),
            quality_score: None,
            processed_at: None,
            created_at: now,
        }
    }

    /// A catalog sample, optionally tied to a channel.
    pub fn sample_upsert(external_id: &str, channel_id: Option<&str>) -> SampleUpsert {
        SampleUpsert {
            external_id: external_id.to_string(),
            title: format!("Sample {}", external_id),
            channel: channel_id.unwrap_or("Unknown").to_string(),
            channel_id: channel_id.map(str::to_string),
            thumbnail_url: Some(thumbnail(external_id)),
            genre: None,
            era: None,
            duration_seconds: Some(200),
            quality_score: Some(70),
        }
    }
}
