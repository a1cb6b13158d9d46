pub mod auth;
pub mod candidate;
pub mod catalog;
pub mod config;
pub mod crawl;
pub mod discovery;
pub mod fetch;
pub mod media_api;
pub mod metrics;
pub mod pipeline;
pub mod scheduler;
pub mod scorer;
pub mod storage;
pub mod testing;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
    SharedSecretAuthenticator,
};
pub use candidate::{Candidate, CandidateSource, CandidateStore, SqliteCandidateStore};
pub use catalog::{CatalogStore, ReputationPolicy, SqliteCatalogStore};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use crawl::{CrawlError, CrawlOptions, CrawlReport, SearchCrawler, SqliteCrawlStateStore};
pub use fetch::{FetchError, KeyRotationState, QuotaAwareClient};
pub use media_api::{MediaApi, YouTubeClient};
pub use pipeline::{Pipeline, PipelineError};
pub use scheduler::{BatchScheduler, SchedulerConfig};
pub use scorer::{HeuristicScorer, Scorer};
pub use storage::StoreError;
