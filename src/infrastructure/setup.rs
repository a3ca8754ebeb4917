//! Project initialization and runtime wiring
//!
//! Handles:
//! - Configuration directory and default config file creation
//! - Database migrations
//! - Building the candidate source, store, and sink from a `Config`

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::sinks::{ConsoleSink, LogSink, WebhookSink};
use crate::adapters::sources::{
    shared_rate_limiter, CompositeCandidateSource, HttpCandidateSource, JsonFileSource,
    RateLimitedSource,
};
use crate::adapters::sqlite::{initialize_database, SqliteRunRepository, SqliteSnapshotStore};
use crate::domain::models::{Config, SinkKind};
use crate::domain::ports::{CandidateSource, NotificationSink, SystemClock};
use crate::infrastructure::config::CONFIG_DIR;
use crate::services::notifier::ReportFormatter;
use crate::services::scan_cycle::ScanCycle;

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# memberscan configuration
# Override settings by editing this file, adding .memberscan/local.yaml,
# or setting environment variables with the MEMBERSCAN_ prefix
#
# Example environment variables:
#   export MEMBERSCAN_FILTER__MIN_CONFIDENCE=0.7
#   export MEMBERSCAN_DATABASE__PATH=/custom/path/memberscan.db
#   export MEMBERSCAN_LOGGING__LEVEL=debug

# Subjects to track
subjects: []
#  - id: "alice"
#    interval_secs: 900

scheduler:
  # Default polling interval in seconds
  default_interval_secs: 1800
  # Subjects scanned at the same time
  max_concurrent_subjects: 4
  # Exponential backoff after a failed cycle
  backoff_base_ms: 10000
  backoff_cap_ms: 600000
  run_on_startup: true

filter:
  # Entries below this confidence are withheld from reports
  min_confidence: 0.6
  filter_left: false

scoring:
  corroboration_bonus: 0.05
  material_confidence_delta: 0.1

sources:
  # Directory of <subject>.json candidate files written by detectors
  candidates_dir: ".memberscan/candidates"
  # Detector endpoints serving GET <endpoint>/<subject>
  http_endpoints: []
  timeout_secs: 60
  rate_limit:
    requests_per_second: 1.0
    burst_size: 5

notify:
  # log, console, or webhook
  sink: "log"
  max_items_per_group: 5

database:
  path: ".memberscan/memberscan.db"
  max_connections: 5

logging:
  level: "info"
  format: "pretty"
  retention_days: 30
"#;

/// Setup paths and directories
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub candidates_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl SetupPaths {
    /// Get setup paths for the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::under(current_dir))
    }

    /// Setup paths rooted at `root`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let config_dir = root.as_ref().join(CONFIG_DIR);
        Self {
            config_file: config_dir.join("config.yaml"),
            candidates_dir: config_dir.join("candidates"),
            logs_dir: config_dir.join("logs"),
            config_dir,
        }
    }

    /// Check if memberscan is already initialized
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

/// Create the configuration directory tree, returning the directories created
pub fn create_config_dirs(paths: &SetupPaths) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for dir in [&paths.config_dir, &paths.candidates_dir, &paths.logs_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
            created.push(dir.clone());
        }
    }
    Ok(created)
}

/// Create the default configuration file
///
/// Returns whether a file was written.
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<bool> {
    if paths.config_file.exists() && !force {
        return Ok(false);
    }

    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE).context("Failed to write config file")?;

    Ok(true)
}

/// Apply pending database migrations for `config`
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;
    Ok(())
}

/// Build the configured candidate source
///
/// Every detector shares one rate limiter and sits behind a composite
/// that applies the per-detector timeout.
pub fn build_candidate_source(config: &Config) -> Result<Arc<dyn CandidateSource>> {
    let limiter = shared_rate_limiter(&config.sources.rate_limit);
    let timeout = Duration::from_secs(config.sources.timeout_secs);

    let mut detectors: Vec<Arc<dyn CandidateSource>> = Vec::new();
    if let Some(dir) = &config.sources.candidates_dir {
        detectors.push(Arc::new(JsonFileSource::new(dir)));
    }
    for (index, endpoint) in config.sources.http_endpoints.iter().enumerate() {
        let source = HttpCandidateSource::new(format!("http_{index}"), endpoint, timeout)
            .with_context(|| format!("Failed to build HTTP source for {endpoint}"))?;
        detectors.push(Arc::new(source));
    }

    if detectors.is_empty() {
        anyhow::bail!("No candidate sources configured; set sources.candidates_dir or sources.http_endpoints");
    }

    let limited = detectors
        .into_iter()
        .map(|detector| Arc::new(RateLimitedSource::new(detector, limiter.clone())) as Arc<dyn CandidateSource>)
        .collect();

    Ok(Arc::new(CompositeCandidateSource::new(limited, timeout)))
}

/// Build the configured notification sink
///
/// `json` selects JSON output for the console sink.
pub fn build_sink(config: &Config, json: bool) -> Result<Arc<dyn NotificationSink>> {
    let formatter = ReportFormatter::new(&config.notify);
    let sink: Arc<dyn NotificationSink> = match config.notify.sink {
        SinkKind::Log => Arc::new(LogSink::new(formatter)),
        SinkKind::Console => Arc::new(ConsoleSink::new(formatter, json)),
        SinkKind::Webhook => {
            let url = config
                .notify
                .webhook_url
                .as_deref()
                .context("notify.webhook_url is required for the webhook sink")?;
            Arc::new(WebhookSink::new(url, formatter).context("Failed to build webhook sink")?)
        }
    };
    Ok(sink)
}

/// Wire a SQLite-backed scan cycle from configuration
pub async fn build_scan_cycle(config: &Config, sink: Arc<dyn NotificationSink>) -> Result<ScanCycle> {
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    let source = build_candidate_source(config)?;

    Ok(ScanCycle::new(
        source,
        Arc::new(SqliteSnapshotStore::new(pool.clone())),
        sink,
        Arc::new(SystemClock),
        config,
    )
    .with_run_repository(Arc::new(SqliteRunRepository::new(pool))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_template_parses() {
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert!(crate::infrastructure::config::ConfigLoader::validate(&config).is_ok());
        assert_eq!(config.notify.sink, SinkKind::Log);
        assert_eq!(config.sources.candidates_dir.as_deref(), Some(".memberscan/candidates"));
    }

    #[test]
    fn test_config_files_created_once() {
        let temp = TempDir::new().unwrap();
        let paths = SetupPaths::under(temp.path());
        assert!(!paths.is_initialized());

        let created = create_config_dirs(&paths).unwrap();
        assert_eq!(created.len(), 3);
        assert!(create_config_file(&paths, false).unwrap());
        assert!(paths.is_initialized());

        assert!(create_config_dirs(&paths).unwrap().is_empty());
        assert!(!create_config_file(&paths, false).unwrap());
        assert!(create_config_file(&paths, true).unwrap());
    }

    #[test]
    fn test_build_candidate_source_requires_detectors() {
        let config = Config::default();
        assert!(build_candidate_source(&config).is_err());

        let mut config = Config::default();
        config.sources.candidates_dir = Some("candidates".to_string());
        config.sources.http_endpoints = vec!["http://localhost:9000/candidates".to_string()];
        assert_eq!(build_candidate_source(&config).unwrap().name(), "composite");
    }

    #[test]
    fn test_build_sink_webhook_requires_url() {
        let mut config = Config::default();
        config.notify.sink = SinkKind::Webhook;
        assert!(build_sink(&config, false).is_err());

        config.notify.webhook_url = Some("http://localhost:9000/hook".to_string());
        assert!(build_sink(&config, false).is_ok());
    }
}
