use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::{Config, SinkKind};

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".memberscan";

/// Environment variable prefix; `__` separates nested keys
pub const ENV_PREFIX: &str = "MEMBERSCAN_";

/// Slowest accepted detector rate: one request per day
pub const MIN_REQUESTS_PER_SECOND: f64 = 1.0 / 86_400.0;

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid min_confidence: {0}. Must be between 0.0 and 1.0")]
    InvalidThreshold(f64),

    #[error("Invalid confidence for method '{0}': {1}. Must be between 0.0 and 1.0")]
    InvalidMethodConfidence(String, f64),

    #[error("Invalid corroboration_bonus: {0}. Must be between 0.0 and 1.0")]
    InvalidCorroborationBonus(f64),

    #[error("Invalid max_concurrent_subjects: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid backoff configuration: backoff_base_ms ({0}) must not exceed backoff_cap_ms ({1})")]
    InvalidBackoff(u64, u64),

    #[error("Invalid polling interval for '{0}': must be at least 1 second")]
    InvalidInterval(String),

    #[error("Duplicate subject id: {0}")]
    DuplicateSubject(String),

    #[error("Subject id cannot be empty")]
    EmptySubjectId,

    #[error("Invalid rate limit: {0}. Must be at least one request per day")]
    InvalidRateLimit(f64),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid source timeout: must be at least 1 second")]
    InvalidSourceTimeout,

    #[error("Webhook sink selected but notify.webhook_url is not set")]
    MissingWebhookUrl,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .memberscan/config.yaml (project config, created by init)
    /// 3. .memberscan/local.yaml (project local overrides, optional)
    /// 4. Environment variables (MEMBERSCAN_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("config.yaml")))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the project directory
    pub fn load_optional(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;

        if !unit.contains(&config.filter.min_confidence) {
            return Err(ConfigError::InvalidThreshold(config.filter.min_confidence));
        }

        for (method, confidence) in &config.scoring.method_confidence {
            if !unit.contains(confidence) {
                return Err(ConfigError::InvalidMethodConfidence(method.clone(), *confidence));
            }
        }

        if !unit.contains(&config.scoring.corroboration_bonus) {
            return Err(ConfigError::InvalidCorroborationBonus(
                config.scoring.corroboration_bonus,
            ));
        }

        // Scheduler
        if config.scheduler.max_concurrent_subjects == 0 {
            return Err(ConfigError::InvalidConcurrency(
                config.scheduler.max_concurrent_subjects,
            ));
        }

        if config.scheduler.backoff_base_ms > config.scheduler.backoff_cap_ms {
            return Err(ConfigError::InvalidBackoff(
                config.scheduler.backoff_base_ms,
                config.scheduler.backoff_cap_ms,
            ));
        }

        if config.scheduler.default_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval("default".to_string()));
        }

        let mut seen = HashSet::new();
        for subject in &config.subjects {
            if subject.id.trim().is_empty() {
                return Err(ConfigError::EmptySubjectId);
            }
            if !seen.insert(subject.id.as_str()) {
                return Err(ConfigError::DuplicateSubject(subject.id.clone()));
            }
            if subject.interval_secs == Some(0) {
                return Err(ConfigError::InvalidInterval(subject.id.clone()));
            }
        }

        // Sources
        let rps = config.sources.rate_limit.requests_per_second;
        if !rps.is_finite() || rps < MIN_REQUESTS_PER_SECOND {
            return Err(ConfigError::InvalidRateLimit(
                config.sources.rate_limit.requests_per_second,
            ));
        }

        if config.sources.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.sources.rate_limit.burst_size));
        }

        if config.sources.timeout_secs == 0 {
            return Err(ConfigError::InvalidSourceTimeout);
        }

        // Notify
        if config.notify.sink == SinkKind::Webhook
            && config.notify.webhook_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::MissingWebhookUrl);
        }

        // Database
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
