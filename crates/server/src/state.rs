use std::sync::Arc;

use cratedigger_core::{
    Authenticator, BatchScheduler, Config, Pipeline, QuotaAwareClient, SanitizedConfig,
    SearchCrawler,
};

/// Shared application state.
///
/// Components are optional so the router can run with only what a given
/// deployment (or test) wires up; handlers answer 503 for missing ones.
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    pipeline: Option<Arc<Pipeline>>,
    crawler: Option<Arc<SearchCrawler>>,
    quota_client: Option<Arc<QuotaAwareClient>>,
    scheduler: Option<Arc<BatchScheduler>>,
}

impl AppState {
    pub fn new(config: Config, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            config,
            authenticator,
            pipeline: None,
            crawler: None,
            quota_client: None,
            scheduler: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: Arc<Pipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_crawler(mut self, crawler: Arc<SearchCrawler>) -> Self {
        self.crawler = Some(crawler);
        self
    }

    pub fn with_quota_client(mut self, client: Arc<QuotaAwareClient>) -> Self {
        self.quota_client = Some(client);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<BatchScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn pipeline(&self) -> Option<&Arc<Pipeline>> {
        self.pipeline.as_ref()
    }

    pub fn crawler(&self) -> Option<&Arc<SearchCrawler>> {
        self.crawler.as_ref()
    }

    pub fn quota_client(&self) -> Option<&Arc<QuotaAwareClient>> {
        self.quota_client.as_ref()
    }

    pub fn scheduler(&self) -> Option<&Arc<BatchScheduler>> {
        self.scheduler.as_ref()
    }
}
