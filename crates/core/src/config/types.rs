use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::catalog::ReputationPolicy;
use crate::crawl::CrawlConfig;
use crate::fetch::parse_api_keys;
use crate::pipeline::{IngestionConfig, PipelineConfig};
use crate::scheduler::SchedulerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub reputation: ReputationPolicy,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared secret expected in the `secret` query parameter
    /// (required when method = "shared_secret").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    SharedSecret,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cratedigger.db")
}

/// API keys as they appear in configuration: either a single value
/// (which may itself be a comma-separated list) or an array of values.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ApiKeySetting {
    One(String),
    Many(Vec<String>),
}

impl Default for ApiKeySetting {
    fn default() -> Self {
        ApiKeySetting::Many(Vec::new())
    }
}

impl ApiKeySetting {
    fn raw_values(&self) -> Vec<&str> {
        match self {
            ApiKeySetting::One(value) => vec![value.as_str()],
            ApiKeySetting::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Outbound media API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// One or more API keys, tried in order.
    #[serde(default)]
    pub keys: ApiKeySetting,
    /// Base URL (default: https://www.googleapis.com/youtube/v3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            keys: ApiKeySetting::default(),
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    /// Parsed, de-duplicated key list in configuration order.
    pub fn key_list(&self) -> Vec<String> {
        parse_api_keys(&self.keys.raw_values())
    }
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: SanitizedApiConfig,
    pub ingestion: IngestionConfig,
    pub pipeline: PipelineConfig,
    pub crawl: CrawlConfig,
    pub reputation: ReputationPolicy,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub secret_configured: bool,
}

/// Sanitized API config (keys hidden, only counted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedApiConfig {
    pub keys_configured: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::SharedSecret => "shared_secret".to_string(),
                },
                secret_configured: config
                    .auth
                    .secret
                    .as_ref()
                    .is_some_and(|s| !s.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            api: SanitizedApiConfig {
                keys_configured: config.api.key_list().len(),
                base_url: config.api.base_url.clone(),
                timeout_secs: config.api.timeout_secs,
            },
            ingestion: config.ingestion.clone(),
            pipeline: config.pipeline.clone(),
            crawl: config.crawl.clone(),
            reputation: config.reputation,
            scheduler: config.scheduler.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> Config {
        toml::from_str(
            r#"
[auth]
method = "none"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_deserialize_valid_config_with_none_auth() {
        let toml = r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::None);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_defaults() {
        let config = minimal_config();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "cratedigger.db");
        assert!(config.api.key_list().is_empty());
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.pipeline.min_score, 55);
        assert!(!config.scheduler.enabled);
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_api_keys_comma_separated() {
        let toml = r#"
[auth]
method = "none"

[api]
keys = "alpha,beta , ,gamma"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.key_list(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_api_keys_array_with_embedded_lists() {
        let toml = r#"
[auth]
method = "none"

[api]
keys = ["alpha", "beta,gamma", "alpha"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.key_list(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[auth]
method = "shared_secret"
secret = "super-secret"

[api]
keys = "key-a,key-b"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        assert_eq!(sanitized.auth.method, "shared_secret");
        assert!(sanitized.auth.secret_configured);
        assert_eq!(sanitized.api.keys_configured, 2);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("key-a"));
    }

    #[test]
    fn test_sanitized_config_without_secret() {
        let sanitized = SanitizedConfig::from(&minimal_config());
        assert_eq!(sanitized.auth.method, "none");
        assert!(!sanitized.auth.secret_configured);
        assert_eq!(sanitized.api.keys_configured, 0);
    }
}
