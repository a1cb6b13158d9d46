//! Mock media API for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetch::{ApiOperation, FetchError};
use crate::media_api::{ItemDetails, ItemPage, ItemSummary, MediaApi};

/// A recorded API call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedApiCall {
    pub operation: ApiOperation,
    /// Query, container ID, source ID, or comma-joined item IDs.
    pub target: String,
    pub page_token: Option<String>,
}

/// Failure injected by [`MockMediaApi::fail_after`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// All keys out of quota.
    Quota,
    /// A 500 from the API.
    Server,
    NotFound,
}

impl MockFailure {
    fn to_error(self, target: &str) -> FetchError {
        match self {
            MockFailure::Quota => FetchError::QuotaExceeded,
            MockFailure::Server => FetchError::Api {
                status: 500,
                message: "mock backend error".to_string(),
            },
            MockFailure::NotFound => FetchError::NotFound(target.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct FailureRule {
    operation: ApiOperation,
    after: usize,
    failure: MockFailure,
    once: bool,
}

/// Mock implementation of the MediaApi trait.
///
/// Containers and searches are configured as fixed pages. Page `N` is
/// addressed by the token `page-N`; the first page takes no token.
///
/// # Example
///
/// ```rust,ignore
/// use cratedigger_core::testing::{MockMediaApi, MockFailure};
///
/// let api = MockMediaApi::new();
/// api.add_container("PL1", vec![vec!["AAAAAAAAAAA"], vec!["BBBBBBBBBBB"]]).await;
/// api.fail_after(ApiOperation::ContainerPage, 1, MockFailure::Quota).await;
/// ```
#[derive(Debug, Default)]
pub struct MockMediaApi {
    containers: Arc<RwLock<HashMap<String, Vec<Vec<ItemSummary>>>>>,
    searches: Arc<RwLock<HashMap<String, Vec<Vec<ItemSummary>>>>>,
    sources: Arc<RwLock<HashMap<String, String>>>,
    details: Arc<RwLock<HashMap<String, ItemDetails>>>,
    failures: Arc<RwLock<Vec<FailureRule>>>,
    calls: Arc<RwLock<Vec<RecordedApiCall>>>,
}

impl MockMediaApi {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Add a container whose pages hold bare items with the given IDs.
    pub async fn add_container(&self, container_id: &str, pages: Vec<Vec<&str>>) {
        self.add_container_items(container_id, bare_pages(pages))
            .await;
    }

    pub async fn add_container_items(&self, container_id: &str, pages: Vec<Vec<ItemSummary>>) {
        self.containers
            .write()
            .await
            .insert(container_id.to_string(), pages);
    }

    /// Add search result pages for an exact query string.
    pub async fn add_search(&self, query: &str, pages: Vec<Vec<&str>>) {
        self.add_search_items(query, bare_pages(pages)).await;
    }

    pub async fn add_search_items(&self, query: &str, pages: Vec<Vec<ItemSummary>>) {
        self.searches
            .write()
            .await
            .insert(query.to_string(), pages);
    }

    /// Map a source to its uploads container.
    pub async fn add_source(&self, source_id: &str, container_id: &str) {
        self.sources
            .write()
            .await
            .insert(source_id.to_string(), container_id.to_string());
    }

    /// Make details available for an item.
    pub async fn add_details(&self, details: ItemDetails) {
        self.details
            .write()
            .await
            .insert(details.external_id.clone(), details);
    }

    /// Let `after` calls of `operation` succeed, then fail every later one.
    pub async fn fail_after(&self, operation: ApiOperation, after: usize, failure: MockFailure) {
        self.failures.write().await.push(FailureRule {
            operation,
            after,
            failure,
            once: false,
        });
    }

    /// Fail only call number `after + 1` of `operation`.
    pub async fn fail_once_after(
        &self,
        operation: ApiOperation,
        after: usize,
        failure: MockFailure,
    ) {
        self.failures.write().await.push(FailureRule {
            operation,
            after,
            failure,
            once: true,
        });
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    pub async fn calls(&self) -> Vec<RecordedApiCall> {
        self.calls.read().await.clone()
    }

    /// Number of calls made for `operation`, failed ones included.
    pub async fn calls_for(&self, operation: ApiOperation) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub async fn search_calls(&self) -> usize {
        self.calls_for(ApiOperation::Search).await
    }

    /// Page tokens sent for `query`, in call order.
    pub async fn search_tokens(&self, query: &str) -> Vec<Option<String>> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation == ApiOperation::Search && c.target == query)
            .map(|c| c.page_token.clone())
            .collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Record the call and return the injected failure, if one applies.
    async fn record(
        &self,
        operation: ApiOperation,
        target: &str,
        page_token: Option<&str>,
    ) -> Result<(), FetchError> {
        let prior = {
            let mut calls = self.calls.write().await;
            let prior = calls.iter().filter(|c| c.operation == operation).count();
            calls.push(RecordedApiCall {
                operation,
                target: target.to_string(),
                page_token: page_token.map(str::to_string),
            });
            prior
        };

        let mut failures = self.failures.write().await;
        let hit = failures
            .iter()
            .position(|r| r.operation == operation && prior >= r.after);
        match hit {
            Some(idx) => {
                let rule = failures[idx].clone();
                if rule.once {
                    failures.remove(idx);
                }
                Err(rule.failure.to_error(target))
            }
            None => Ok(()),
        }
    }
}

fn bare_pages(pages: Vec<Vec<&str>>) -> Vec<Vec<ItemSummary>> {
    pages
        .into_iter()
        .map(|page| page.into_iter().map(ItemSummary::new).collect())
        .collect()
}

fn page_at(
    pages: &[Vec<ItemSummary>],
    page_token: Option<&str>,
) -> Result<ItemPage, FetchError> {
    let index = match page_token {
        None => 0,
        Some(token) => token
            .strip_prefix("page-")
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| FetchError::Api {
                status: 400,
                message: format!("invalid page token: {}", token),
            })?,
    };
    let items = pages.get(index).cloned().unwrap_or_default();
    let next_page_token = (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));
    Ok(ItemPage {
        items,
        next_page_token,
    })
}

#[async_trait]
impl MediaApi for MockMediaApi {
    async fn search_page(
        &self,
        query: &str,
        _page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, FetchError> {
        self.record(ApiOperation::Search, query, page_token).await?;
        match self.searches.read().await.get(query) {
            Some(pages) => page_at(pages, page_token),
            None => Ok(ItemPage::default()),
        }
    }

    async fn container_page(
        &self,
        container_id: &str,
        _page_size: u32,
        page_token: Option<&str>,
    ) -> Result<ItemPage, FetchError> {
        self.record(ApiOperation::ContainerPage, container_id, page_token)
            .await?;
        match self.containers.read().await.get(container_id) {
            Some(pages) => page_at(pages, page_token),
            None => Err(FetchError::NotFound(container_id.to_string())),
        }
    }

    async fn source_container(&self, source_id: &str) -> Result<String, FetchError> {
        self.record(ApiOperation::SourceLookup, source_id, None)
            .await?;
        self.sources
            .read()
            .await
            .get(source_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(source_id.to_string()))
    }

    async fn item_details(&self, ids: &[String]) -> Result<Vec<ItemDetails>, FetchError> {
        self.record(ApiOperation::ItemDetails, &ids.join(","), None)
            .await?;
        let details = self.details.read().await;
        Ok(ids.iter().filter_map(|id| details.get(id).cloned()).collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
