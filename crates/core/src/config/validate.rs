use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde) and shared secret is set when required
/// - Server port is not 0
/// - Score threshold, reputation policy and crawl bounds are in range
/// - Scheduler has API keys to spend
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::SharedSecret
        && config.auth.secret.as_ref().is_none_or(|s| s.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.secret must be set when using shared_secret auth".to_string(),
        ));
    }

    if config.pipeline.min_score > 100 {
        return Err(ConfigError::ValidationError(
            "pipeline.min_score must be between 0 and 100".to_string(),
        ));
    }

    if config.pipeline.enrich_batch_size == 0 || config.pipeline.enrich_batch_size > 50 {
        return Err(ConfigError::ValidationError(
            "pipeline.enrich_batch_size must be between 1 and 50".to_string(),
        ));
    }

    let reputation = &config.reputation;
    if !(0.0..=1.0).contains(&reputation.base_penalty) {
        return Err(ConfigError::ValidationError(
            "reputation.base_penalty must be between 0.0 and 1.0".to_string(),
        ));
    }
    if reputation.damping_factor < 0.0 || !reputation.damping_factor.is_finite() {
        return Err(ConfigError::ValidationError(
            "reputation.damping_factor must be a non-negative number".to_string(),
        ));
    }

    if config.crawl.max_pages_per_run == 0 {
        return Err(ConfigError::ValidationError(
            "crawl.max_pages_per_run cannot be 0".to_string(),
        ));
    }

    if config.scheduler.enabled {
        if config.scheduler.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.interval_secs cannot be 0".to_string(),
            ));
        }
        if config.api.key_list().is_empty() {
            return Err(ConfigError::ValidationError(
                "scheduler is enabled but no api.keys are configured".to_string(),
            ));
        }
    }

    Ok(())
}
