//! Quota-aware access to the metered media API.
//!
//! Every outbound call goes through [`QuotaAwareClient`], which rotates
//! across the configured API keys. A key that reports its quota as spent is
//! parked in a process-local [`KeyRotationState`] until restart; once every
//! key is parked calls fail with [`FetchError::QuotaExceeded`].

mod client;
mod key_rotation;

pub use client::{is_quota_signal, QuotaAwareClient};
pub use key_rotation::{KeyRotationState, KeyStatus};

use serde::Serialize;
use thiserror::Error;

/// Errors produced by outbound API calls.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every configured key has exhausted its quota for the period.
    #[error("API quota exceeded for all configured keys")]
    QuotaExceeded,

    /// The key used for this attempt is out of quota; rotate to the next one.
    #[error("API key quota exhausted")]
    KeyQuotaExhausted,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found (404 or an empty lookup).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Client not configured (no API keys, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl FetchError {
    /// Whether this error stops a batch rather than a single page or item.
    pub fn is_quota(&self) -> bool {
        matches!(self, FetchError::QuotaExceeded | FetchError::KeyQuotaExhausted)
    }
}

/// Metered API operations and their quota unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiOperation {
    /// Full-text search; the expensive call.
    Search,
    /// One page of a container (playlist) listing.
    ContainerPage,
    /// Resolving a source (channel) to its uploads container.
    SourceLookup,
    /// Batch metadata lookup for up to 50 items.
    ItemDetails,
}

impl ApiOperation {
    pub fn unit_cost(self) -> u64 {
        match self {
            ApiOperation::Search => 100,
            ApiOperation::ContainerPage => 1,
            ApiOperation::SourceLookup => 1,
            ApiOperation::ItemDetails => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiOperation::Search => "search",
            ApiOperation::ContainerPage => "container_page",
            ApiOperation::SourceLookup => "source_lookup",
            ApiOperation::ItemDetails => "item_details",
        }
    }
}

/// Parse API keys from one or more configuration values.
///
/// Each value may hold a comma-separated list. Entries are trimmed; blanks
/// and repeats are dropped while keeping first-seen order.
pub fn parse_api_keys(values: &[&str]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for value in values {
        for key in value.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            if !keys.iter().any(|existing| existing == key) {
                keys.push(key.to_string());
            }
        }
    }
    keys
}
