//! Resumable multi-query search crawl.
//!
//! Search pages are the most expensive calls the API offers, so the
//! crawler persists its cursor after every page: a crash or restart resumes
//! at the next unfetched page instead of paying for the same pages again.

mod config;
mod runner;
mod state;

pub use config::CrawlConfig;
pub use runner::{CrawlOptions, CrawlReport, SearchCrawler, StopReason};
pub use state::{CrawlState, CrawlStateStore, SqliteCrawlStateStore};

use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// Quota ran out; the cursor of the last fetched page is saved.
    #[error("API quota exceeded")]
    QuotaExceeded,

    #[error("a crawl is already running")]
    AlreadyRunning,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("pipeline error: {0}")]
    Pipeline(PipelineError),
}

impl From<PipelineError> for CrawlError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::QuotaExceeded => CrawlError::QuotaExceeded,
            PipelineError::Store(e) => CrawlError::Store(e),
            other => CrawlError::Pipeline(other),
        }
    }
}
