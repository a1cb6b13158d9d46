//! Discovery: bounded lookups of external item IDs.
//!
//! Page-level failures abort the current call but never discard what was
//! already collected: every operation returns a [`Discovered`] carrying the
//! items gathered so far plus the error that stopped it, if any.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::fetch::FetchError;
use crate::media_api::{ItemSummary, MediaApi, MAX_PAGE_SIZE};

/// Consecutive pages without a usable item before a listing gives up.
const ZERO_PROGRESS_PAGE_LIMIT: u32 = 3;

/// Pages allowed beyond the ones `max_items` needs at full page size.
const PAGE_CEILING_SLACK: u32 = 5;

/// Result of a discovery call.
#[derive(Debug, Default)]
pub struct Discovered {
    pub items: Vec<ItemSummary>,
    /// Pages fetched (each one a metered call).
    pub pages: u32,
    /// The failure that cut the listing short.
    pub error: Option<FetchError>,
}

impl Discovered {
    fn failed(error: FetchError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Paginated discovery on top of a [`MediaApi`].
pub struct Discovery {
    api: Arc<dyn MediaApi>,
    page_delay: Duration,
}

impl Discovery {
    pub fn new(api: Arc<dyn MediaApi>, page_delay: Duration) -> Self {
        Self { api, page_delay }
    }

    /// One search call returning at most `max_results` items.
    pub async fn search_by_query(&self, query: &str, max_results: u32) -> Discovered {
        if max_results == 0 {
            return Discovered::default();
        }
        let page_size = max_results.clamp(1, MAX_PAGE_SIZE);
        match self.api.search_page(query, page_size, None).await {
            Ok(page) => {
                let mut items = page.items;
                items.truncate(max_results as usize);
                Discovered {
                    items,
                    pages: 1,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Search '{}' failed: {}", query, e);
                Discovered::failed(e)
            }
        }
    }

    /// List up to `max_items` items from a container, page by page.
    ///
    /// Stops when `max_items` is reached, the API returns no next cursor or
    /// repeats one, [`ZERO_PROGRESS_PAGE_LIMIT`] pages in a row yield
    /// nothing, or the page ceiling for `max_items` is hit.
    pub async fn list_items_from_container(
        &self,
        container_id: &str,
        max_items: u32,
    ) -> Discovered {
        let mut result = Discovered::default();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut empty_pages = 0u32;
        let max_pages = max_items.div_ceil(MAX_PAGE_SIZE) + PAGE_CEILING_SLACK;

        while result.items.len() < max_items as usize {
            if result.pages >= max_pages {
                warn!(
                    "Listing {} hit the page ceiling ({}) with {} item(s)",
                    container_id,
                    max_pages,
                    result.items.len()
                );
                break;
            }
            if result.pages > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let remaining = max_items as usize - result.items.len();
            let page_size = (remaining as u32).min(MAX_PAGE_SIZE);

            let page = match self
                .api
                .container_page(container_id, page_size, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        "Listing {} stopped after {} page(s): {}",
                        container_id, result.pages, e
                    );
                    result.error = Some(e);
                    break;
                }
            };

            result.pages += 1;
            debug!(
                "Container {} page {}: {} item(s)",
                container_id,
                result.pages,
                page.items.len()
            );

            if page.items.is_empty() {
                empty_pages += 1;
                if empty_pages >= ZERO_PROGRESS_PAGE_LIMIT {
                    warn!(
                        "Listing {} returned {} empty page(s) in a row, stopping",
                        container_id, empty_pages
                    );
                    break;
                }
            } else {
                empty_pages = 0;
            }

            let take = page.items.len().min(remaining);
            result.items.extend(page.items.into_iter().take(take));

            match page.next_page_token {
                Some(token) if seen_tokens.insert(token.clone()) => page_token = Some(token),
                Some(token) => {
                    warn!("Listing {} repeated cursor {}, stopping", container_id, token);
                    break;
                }
                None => break,
            }
        }

        result
    }

    /// Resolve a source's uploads container and list from it.
    pub async fn list_items_from_source(&self, source_id: &str, max_items: u32) -> Discovered {
        let container_id = match self.api.source_container(source_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not resolve uploads for {}: {}", source_id, e);
                return Discovered::failed(e);
            }
        };

        self.list_items_from_container(&container_id, max_items)
            .await
    }
}
