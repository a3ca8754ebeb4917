use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure for memberscan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Subjects to track
    #[serde(default)]
    pub subjects: Vec<SubjectConfig>,

    /// Polling scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Confidence scoring configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Confidence filter configuration
    #[serde(default)]
    pub filter: FilterConfig,

    /// Candidate source configuration
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subjects: vec![],
            scheduler: SchedulerSettings::default(),
            scoring: ScoringConfig::default(),
            filter: FilterConfig::default(),
            sources: SourcesConfig::default(),
            notify: NotifyConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Effective polling interval for a subject.
    pub fn interval_for(&self, subject: &SubjectConfig) -> Duration {
        Duration::from_secs(
            subject
                .interval_secs
                .unwrap_or(self.scheduler.default_interval_secs),
        )
    }
}

/// A tracked subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubjectConfig {
    /// Subject identifier (account handle or id)
    pub id: String,

    /// Per-subject polling interval override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerSettings {
    /// Default polling interval in seconds
    #[serde(default = "default_interval_secs")]
    pub default_interval_secs: u64,

    /// Maximum number of subjects scanned concurrently
    #[serde(default = "default_max_concurrent_subjects")]
    pub max_concurrent_subjects: usize,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Run a cycle immediately when a subject starts
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

const fn default_interval_secs() -> u64 {
    1800
}

const fn default_max_concurrent_subjects() -> usize {
    4
}

const fn default_backoff_base_ms() -> u64 {
    10_000
}

const fn default_backoff_cap_ms() -> u64 {
    600_000
}

const fn default_true() -> bool {
    true
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_interval_secs: default_interval_secs(),
            max_concurrent_subjects: default_max_concurrent_subjects(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            run_on_startup: default_true(),
        }
    }
}

/// Confidence scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringConfig {
    /// Base confidence per detection method tag
    #[serde(default = "default_method_confidence")]
    pub method_confidence: BTreeMap<String, f64>,

    /// Bonus added when two or more distinct methods agree
    #[serde(default = "default_corroboration_bonus")]
    pub corroboration_bonus: f64,

    /// Minimum confidence movement reported as an update
    #[serde(default = "default_material_confidence_delta")]
    pub material_confidence_delta: f64,
}

fn default_method_confidence() -> BTreeMap<String, f64> {
    [
        ("direct_dom_element", 0.98),
        ("direct_id_url", 0.95),
        ("graphql_direct", 0.95),
        ("creation_text_pattern", 0.88),
        ("joining_text_pattern", 0.78),
        ("hashtag_pattern", 0.65),
        ("mention_pattern", 0.65),
        ("social_graph_inference", 0.45),
    ]
    .into_iter()
    .map(|(method, confidence)| (method.to_string(), confidence))
    .collect()
}

const fn default_corroboration_bonus() -> f64 {
    0.05
}

const fn default_material_confidence_delta() -> f64 {
    0.10
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            method_confidence: default_method_confidence(),
            corroboration_bonus: default_corroboration_bonus(),
            material_confidence_delta: default_material_confidence_delta(),
        }
    }
}

/// Confidence filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FilterConfig {
    /// Minimum confidence for an entry to be visible
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Also filter departures by their last known confidence
    #[serde(default)]
    pub filter_left: bool,
}

const fn default_min_confidence() -> f64 {
    0.6
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            filter_left: false,
        }
    }
}

/// Candidate source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourcesConfig {
    /// Directory of `<subject>.json` candidate files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_dir: Option<String>,

    /// HTTP detector endpoints serving candidate JSON
    #[serde(default)]
    pub http_endpoints: Vec<String>,

    /// Per-detector timeout in seconds
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,

    /// Shared rate limit across detectors
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

const fn default_source_timeout_secs() -> u64 {
    60
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            candidates_dir: None,
            http_endpoints: vec![],
            timeout_secs: default_source_timeout_secs(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Burst size for token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> f64 {
    1.0
}

const fn default_burst_size() -> u32 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Where change reports are published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Log,
    Console,
    Webhook,
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotifyConfig {
    /// Sink used to publish reports
    #[serde(default = "default_sink")]
    pub sink: SinkKind,

    /// Webhook URL (required for the webhook sink)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Items shown per group before "...and N more"
    #[serde(default = "default_max_items_per_group")]
    pub max_items_per_group: usize,
}

const fn default_sink() -> SinkKind {
    SinkKind::Log
}

const fn default_max_items_per_group() -> usize {
    5
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
            webhook_url: None,
            max_items_per_group: default_max_items_per_group(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".memberscan/memberscan.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}
