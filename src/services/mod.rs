//! Application services for membership reconciliation.

pub mod confidence_filter;
pub mod confidence_scorer;
pub mod deduplicator;
pub mod diff_engine;
pub mod notifier;
pub mod scan_cycle;
pub mod scheduler;

pub use confidence_filter::{ConfidenceFilter, FilteredDiff};
pub use confidence_scorer::ConfidenceScorer;
pub use deduplicator::{Deduplicator, MergeOutcome};
pub use diff_engine::DiffEngine;
pub use notifier::{Notifier, ReportFormatter};
pub use scan_cycle::{CancelHandle, CancelSignal, CycleOutcome, ScanCycle};
pub use scheduler::{
    BackoffPolicy, Scheduler, SchedulerConfig, SchedulerEvent, SchedulerHandle, SubjectState,
    SubjectStatus,
};
