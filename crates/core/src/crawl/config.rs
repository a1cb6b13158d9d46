//! Search crawl configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the resumable multi-query search crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Name under which the resume cursor is stored.
    #[serde(default = "default_name")]
    pub name: String,

    /// Search queries, crawled in order.
    #[serde(default)]
    pub queries: Vec<String>,

    /// Hard ceiling on search pages per invocation (each page costs 100 units).
    #[serde(default = "default_max_pages")]
    pub max_pages_per_run: u32,

    /// Move to the next query after this many consecutive pages without a
    /// new keyword match.
    #[serde(default = "default_zero_match_limit")]
    pub zero_match_page_limit: u32,

    /// Delay between search pages (milliseconds).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Results requested per search page (max 50).
    #[serde(default = "default_results_per_page")]
    pub results_per_page: u32,
}

fn default_name() -> String {
    "search".to_string()
}

fn default_max_pages() -> u32 {
    20
}

fn default_zero_match_limit() -> u32 {
    3
}

fn default_page_delay() -> u64 {
    800
}

fn default_results_per_page() -> u32 {
    50
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            queries: Vec::new(),
            max_pages_per_run: default_max_pages(),
            zero_match_page_limit: default_zero_match_limit(),
            page_delay_ms: default_page_delay(),
            results_per_page: default_results_per_page(),
        }
    }
}
