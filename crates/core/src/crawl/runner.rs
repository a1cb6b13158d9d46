//! Search crawl runner.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{CrawlConfig, CrawlError, CrawlState, CrawlStateStore};
use crate::candidate::CandidateSource;
use crate::media_api::{ItemSummary, MAX_PAGE_SIZE};
use crate::metrics::{CRAWL_PAGES, STAGE_DURATION};
use crate::pipeline::Pipeline;
use crate::scorer::has_keyword_signal;

/// Why a crawl invocation returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every query exhausted; saved state cleared.
    Finished,
    /// Per-invocation page ceiling reached; state saved.
    PageCap,
    /// A page failed; state saved at the failed page.
    Error,
}

/// Per-invocation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Page cap for this run, bounded by `max_pages_per_run`.
    pub max_pages: Option<u32>,
    /// Discard saved state and start from the first query.
    pub fresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub pages_fetched: u32,
    pub items_seen: u32,
    pub added: u32,
    pub skipped: u32,
    /// Query index the next run will start at.
    pub stage_index: u32,
    pub finished: bool,
    pub stopped_by: StopReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Crawls the configured search queries page by page, staging keyword
/// matches as candidates.
pub struct SearchCrawler {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn CrawlStateStore>,
    config: CrawlConfig,
    running: Mutex<()>,
}

impl SearchCrawler {
    pub fn new(
        pipeline: Arc<Pipeline>,
        store: Arc<dyn CrawlStateStore>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            pipeline,
            store,
            config,
            running: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Saved resume state, if any.
    pub fn state(&self) -> Result<Option<CrawlState>, CrawlError> {
        Ok(self.store.load(&self.config.name)?)
    }

    /// Discard saved resume state.
    pub fn reset(&self) -> Result<bool, CrawlError> {
        Ok(self.store.clear(&self.config.name)?)
    }

    /// Run the crawl from the saved cursor.
    ///
    /// State is saved after every page. A quota failure returns
    /// [`CrawlError::QuotaExceeded`] with the cursor pointing at the page
    /// that failed.
    pub async fn run(&self, options: CrawlOptions) -> Result<CrawlReport, CrawlError> {
        let _guard = self.running.try_lock().map_err(|_| CrawlError::AlreadyRunning)?;
        let _timer = STAGE_DURATION.with_label_values(&["crawl"]).start_timer();

        if options.fresh && self.store.clear(&self.config.name)? {
            info!("Crawl '{}': discarded saved state", self.config.name);
        }

        let mut state = self
            .store
            .load(&self.config.name)?
            .unwrap_or_else(|| CrawlState::new(&self.config.name));

        let max_pages = options
            .max_pages
            .unwrap_or(self.config.max_pages_per_run)
            .min(self.config.max_pages_per_run);
        let page_size = self.config.results_per_page.clamp(1, MAX_PAGE_SIZE);
        let delay = Duration::from_millis(self.config.page_delay_ms);
        let queries = &self.config.queries;

        let mut report = CrawlReport {
            pages_fetched: 0,
            items_seen: 0,
            added: 0,
            skipped: 0,
            stage_index: state.stage_index,
            finished: false,
            stopped_by: StopReason::PageCap,
            error: None,
        };

        loop {
            let Some(query) = queries.get(state.stage_index as usize) else {
                self.store.clear(&self.config.name)?;
                report.finished = true;
                report.stopped_by = StopReason::Finished;
                break;
            };

            if report.pages_fetched >= max_pages {
                report.stopped_by = StopReason::PageCap;
                break;
            }

            if report.pages_fetched > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let page = match self
                .pipeline
                .api()
                .search_page(query, page_size, state.page_cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) if e.is_quota() => {
                    warn!(
                        "Crawl '{}' stopped on quota at query #{} after {} page(s)",
                        self.config.name, state.stage_index, report.pages_fetched
                    );
                    return Err(CrawlError::QuotaExceeded);
                }
                Err(e) => {
                    warn!("Crawl '{}' page failed: {}", self.config.name, e);
                    report.error = Some(e.to_string());
                    report.stopped_by = StopReason::Error;
                    break;
                }
            };

            report.pages_fetched += 1;
            report.items_seen += page.items.len() as u32;
            state.pages_fetched += 1;
            CRAWL_PAGES.inc();

            let matching: Vec<ItemSummary> = page
                .items
                .into_iter()
                .filter(|item| has_keyword_signal(&item_text(item)))
                .collect();
            let staged =
                self.pipeline
                    .stage_items(&matching, CandidateSource::Search, Some(query))?;
            report.added += staged.added;
            report.skipped += staged.skipped;

            if staged.added > 0 {
                state.zero_match_pages = 0;
            } else {
                state.zero_match_pages += 1;
            }

            debug!(
                "Crawl '{}' query #{} page: {} match(es), {} new",
                self.config.name,
                state.stage_index,
                matching.len(),
                staged.added
            );

            let exhausted = state.zero_match_pages >= self.config.zero_match_page_limit.max(1);
            match page.next_page_token {
                Some(token) if !exhausted => state.page_cursor = Some(token),
                _ => {
                    if exhausted {
                        info!(
                            "Crawl '{}': query '{}' gave {} page(s) without matches, moving on",
                            self.config.name, query, state.zero_match_pages
                        );
                    }
                    state.stage_index += 1;
                    state.page_cursor = None;
                    state.zero_match_pages = 0;
                }
            }

            state.updated_at = Utc::now();
            self.store.save(&state)?;
        }

        report.stage_index = state.stage_index;
        info!(
            "Crawl '{}': {} page(s), {} added, stopped by {:?}",
            self.config.name, report.pages_fetched, report.added, report.stopped_by
        );
        Ok(report)
    }
}

fn item_text(item: &ItemSummary) -> String {
    format!(
        "{} {}",
        item.title.as_deref().unwrap_or_default(),
        item.description.as_deref().unwrap_or_default()
    )
}
