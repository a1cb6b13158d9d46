//! YouTube Data API v3 client.
//!
//! Quota costs per call: search 100 units, playlistItems 1, channels 1,
//! videos 1. Every call goes through [`QuotaAwareClient`] so keys rotate
//! transparently.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{ItemDetails, ItemPage, ItemSummary, MediaApi, MAX_PAGE_SIZE};
use crate::fetch::{ApiOperation, FetchError, QuotaAwareClient};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

static ISO8601_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:([0-9]+)D)?(?:T(?:([0-9]+)H)?(?:([0-9]+)M)?(?:([0-9]+)S)?)?$").unwrap()
});

/// Parse an ISO-8601 duration such as `PT4M13S` into seconds.
///
/// Returns `None` for malformed input and for totals that do not fit a `u32`.
pub fn parse_iso8601_duration(s: &str) -> Option<u32> {
    let caps = ISO8601_DURATION.captures(s)?;
    let mut total: u64 = 0;
    for (group, unit) in [(1, 86_400u64), (2, 3600), (3, 60), (4, 1)] {
        let Some(m) = caps.get(group) else { continue };
        let value = m.as_str().parse::<u64>().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
    }
    u32::try_from(total).ok()
}

/// YouTube Data API client.
pub struct YouTubeClient {
    http: Arc<QuotaAwareClient>,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(http: Arc<QuotaAwareClient>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self { http, base_url }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: ApiOperation,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .fetch_with_key_rotation(operation, |client, key| {
                client.get(&url).query(params).query(&[("key", key)])
            })
            .await?;

        response.json().await.map_err(|e| {
            FetchError::Parse(format!("Failed to parse {} response: {}", endpoint, e))
        })
    }
}

#[async_trait]
impl MediaApi for YouTubeClient {
    async fn search_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, FetchError> {
        debug!("YouTube search: query='{}', page_token={:?}", query, page_token);

        let mut params = vec![
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("q", query.to_string()),
            ("maxResults", page_size.min(MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response: ListResponse<SearchItem> =
            self.get_json(ApiOperation::Search, "search", &params).await?;

        Ok(ItemPage {
            items: response
                .items
                .into_iter()
                .filter_map(SearchItem::into_summary)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn container_page(
        &self,
        container_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, FetchError> {
        debug!(
            "YouTube playlistItems: playlist={}, page_token={:?}",
            container_id, page_token
        );

        let mut params = vec![
            ("part", "snippet,contentDetails".to_string()),
            ("playlistId", container_id.to_string()),
            ("maxResults", page_size.min(MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response: ListResponse<PlaylistItem> = self
            .get_json(ApiOperation::ContainerPage, "playlistItems", &params)
            .await?;

        Ok(ItemPage {
            items: response
                .items
                .into_iter()
                .filter_map(PlaylistItem::into_summary)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn source_container(&self, source_id: &str) -> Result<String, FetchError> {
        debug!("YouTube channels: channel={}", source_id);

        let params = [
            ("part", "contentDetails".to_string()),
            ("id", source_id.to_string()),
        ];
        let response: ListResponse<ChannelItem> = self
            .get_json(ApiOperation::SourceLookup, "channels", &params)
            .await?;

        response
            .items
            .into_iter()
            .find_map(|c| c.content_details.and_then(|d| d.related_playlists.uploads))
            .ok_or_else(|| FetchError::NotFound(format!("uploads playlist for {}", source_id)))
    }

    async fn item_details(&self, ids: &[String]) -> Result<Vec<ItemDetails>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_PAGE_SIZE as usize {
            return Err(FetchError::Api {
                status: 400,
                message: format!(
                    "at most {} ids per details lookup, got {}",
                    MAX_PAGE_SIZE,
                    ids.len()
                ),
            });
        }

        debug!("YouTube videos: {} ids", ids.len());

        let params = [
            ("part", "snippet,contentDetails".to_string()),
            ("id", ids.join(",")),
        ];
        let response: ListResponse<VideoItem> = self
            .get_json(ApiOperation::ItemDetails, "videos", &params)
            .await?;

        Ok(response.items.into_iter().map(ItemDetails::from).collect())
    }

    fn name(&self) -> &str {
        "youtube"
    }
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    channel_title: Option<String>,
    channel_id: Option<String>,
    video_owner_channel_title: Option<String>,
    video_owner_channel_id: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    thumbnails: Option<Thumbnails>,
    resource_id: Option<ResourceId>,
}

impl Snippet {
    fn thumbnail_url(&self) -> Option<String> {
        let thumbs = self.thumbnails.as_ref()?;
        [&thumbs.high, &thumbs.medium, &thumbs.default]
            .into_iter()
            .flatten()
            .next()
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    #[serde(default)]
    snippet: Snippet,
}

impl SearchItem {
    fn into_summary(self) -> Option<ItemSummary> {
        let external_id = self.id.video_id?;
        let thumbnail_url = self.snippet.thumbnail_url();
        Some(ItemSummary {
            external_id,
            title: self.snippet.title,
            channel_title: self.snippet.channel_title,
            channel_id: self.snippet.channel_id,
            thumbnail_url,
            description: self.snippet.description,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    #[serde(default)]
    snippet: Snippet,
    content_details: Option<PlaylistContentDetails>,
}

impl PlaylistItem {
    fn into_summary(self) -> Option<ItemSummary> {
        let external_id = self
            .content_details
            .and_then(|d| d.video_id)
            .or_else(|| self.snippet.resource_id.as_ref()?.video_id.clone())?;
        let thumbnail_url = self.snippet.thumbnail_url();
        let snippet = self.snippet;
        Some(ItemSummary {
            external_id,
            title: snippet.title,
            // The playlist owner is not the uploader.
            channel_title: snippet.video_owner_channel_title,
            channel_id: snippet.video_owner_channel_id,
            thumbnail_url,
            description: snippet.description,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    content_details: Option<VideoContentDetails>,
}

impl From<VideoItem> for ItemDetails {
    fn from(v: VideoItem) -> Self {
        let thumbnail_url = v.snippet.thumbnail_url();
        let duration_seconds = v
            .content_details
            .and_then(|d| d.duration)
            .and_then(|d| parse_iso8601_duration(&d));
        ItemDetails {
            external_id: v.id,
            title: v.snippet.title,
            channel_title: v.snippet.channel_title,
            channel_id: v.snippet.channel_id,
            thumbnail_url,
            description: v.snippet.description,
            tags: v.snippet.tags,
            duration_seconds,
        }
    }
}
