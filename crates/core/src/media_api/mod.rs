//! Metered media API: search, container listings and item details.
//!
//! [`YouTubeClient`] talks to a YouTube-Data-API-shaped service through the
//! quota-aware fetch client. The [`MediaApi`] trait lets stages run against
//! a mock in tests.

mod youtube;

pub use youtube::{parse_iso8601_duration, YouTubeClient, DEFAULT_BASE_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::fetch::FetchError;

/// Maximum items per page and per details lookup.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Lightweight item metadata returned by listings and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub external_id: String,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub channel_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
}

impl ItemSummary {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            title: None,
            channel_title: None,
            channel_id: None,
            thumbnail_url: None,
            description: None,
        }
    }
}

/// One page of results plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPage {
    pub items: Vec<ItemSummary>,
    pub next_page_token: Option<String>,
}

/// Full item metadata from a details lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub external_id: String,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub channel_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration_seconds: Option<u32>,
}

/// Operations against the metered media API.
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// One page of full-text search results (expensive).
    async fn search_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, FetchError>;

    /// One page of a container listing.
    async fn container_page(
        &self,
        container_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, FetchError>;

    /// Resolve a source to its uploads container.
    async fn source_container(&self, source_id: &str) -> Result<String, FetchError>;

    /// Details for up to [`MAX_PAGE_SIZE`] items. Items unknown upstream are
    /// absent from the result.
    async fn item_details(&self, ids: &[String]) -> Result<Vec<ItemDetails>, FetchError>;

    /// Name of this backend for logging.
    fn name(&self) -> &str;
}
