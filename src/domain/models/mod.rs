//! Domain models for membership reconciliation.

pub mod candidate;
pub mod community;
pub mod config;
pub mod diff;
pub mod report;
pub mod snapshot;

pub use candidate::{Candidate, DetectionMethod, Role};
pub use community::CanonicalCommunity;
pub use config::{
    Config, DatabaseConfig, FilterConfig, LoggingConfig, NotifyConfig, RateLimitConfig,
    SchedulerSettings, ScoringConfig, SinkKind, SourcesConfig, SubjectConfig,
};
pub use diff::{
    CommunityUpdate, DiffResult, FieldChange, JoinKind, JoinedEntry, RoleChange, SuppressedCounts,
};
pub use report::{
    ChangeReport, FailureKind, MembershipTotals, ReportBody, RunStatus, ScanRun,
};
pub use snapshot::Snapshot;
