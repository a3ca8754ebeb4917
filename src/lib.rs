//! memberscan - community membership reconciliation
//!
//! Detectors observe which communities a subject belongs to, each with its
//! own method and confidence. memberscan merges those noisy observations
//! into canonical communities, diffs them against the last committed
//! snapshot, withholds low-confidence changes, and publishes one report per
//! scan cycle.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, port traits, and typed errors
//! - **Service Layer** (`services`): Merge, diff, filter, and scheduling logic
//! - **Adapters** (`adapters`): Candidate sources, sinks, and snapshot stores
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging, setup
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use memberscan::adapters::memory::InMemorySnapshotStore;
//! use memberscan::adapters::sinks::LogSink;
//! use memberscan::adapters::sources::JsonFileSource;
//! use memberscan::domain::ports::SystemClock;
//! use memberscan::services::{CancelSignal, ReportFormatter, ScanCycle};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cycle = ScanCycle::new(
//!         Arc::new(JsonFileSource::new("candidates")),
//!         Arc::new(InMemorySnapshotStore::new()),
//!         Arc::new(LogSink::new(ReportFormatter::default())),
//!         Arc::new(SystemClock),
//!         &memberscan::Config::default(),
//!     );
//!     let outcome = cycle.run("alice", &CancelSignal::never()).await?;
//!     println!("{} communities", outcome.snapshot.len());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{CandidateSourceError, CycleError, NotifyError, StoreError, ValidationError};
pub use domain::models::{
    Candidate, CanonicalCommunity, ChangeReport, Config, DetectionMethod, DiffResult, Role, ScanRun,
    Snapshot,
};
pub use domain::ports::{CandidateSource, Clock, NotificationSink, RunRepository, SnapshotStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CancelSignal, ConfidenceFilter, ConfidenceScorer, Deduplicator, DiffEngine, ScanCycle, Scheduler,
};
