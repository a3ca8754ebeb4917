//! Domain errors for memberscan.
//!
//! Each stage of a scan cycle has its own error type so callers can decide
//! whether a failure aborts the cycle, drops one candidate, or is only
//! surfaced alongside an otherwise successful result.

use std::time::Duration;

use thiserror::Error;

use super::models::report::FailureKind;

fn join_messages(messages: &[String]) -> String {
    messages.join("; ")
}

/// A detector failed, timed out, or produced nothing usable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CandidateSourceError {
    #[error("Candidate source '{source_name}' failed: {message}")]
    Failed { source_name: String, message: String },

    #[error("Candidate source '{source_name}' timed out after {after:?}")]
    Timeout { source_name: String, after: Duration },

    #[error("No candidates returned for subject '{subject_id}' while a previous snapshot exists")]
    NoCandidates { subject_id: String },

    #[error("All {count} candidate sources failed for subject '{subject_id}': {}", join_messages(.messages))]
    AllSourcesFailed {
        subject_id: String,
        count: usize,
        messages: Vec<String>,
    },
}

impl CandidateSourceError {
    pub fn failed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Snapshot or run-history persistence failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to read snapshot for '{subject_id}': {message}")]
    Read { subject_id: String, message: String },

    #[error("Failed to write snapshot for '{subject_id}': {message}")]
    Write { subject_id: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A malformed candidate; it is dropped and the cycle continues.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Candidate '{raw_name}' has an empty source id")]
    EmptySourceId { raw_name: String },

    #[error("Candidate '{source_id}' has an empty name")]
    EmptyName { source_id: String },

    #[error("Candidate '{source_id}' has confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { source_id: String, value: f64 },

    #[error("Candidate '{source_id}' name normalizes to fewer than 3 characters")]
    NameTooShort { source_id: String },
}

/// The notification sink could not deliver a report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Sink rejected report with status {status}")]
    Rejected { status: u16 },

    #[error("Failed to encode report: {0}")]
    Encoding(String),
}

/// Errors that abort a scan cycle before the snapshot is replaced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CycleError {
    #[error(transparent)]
    CandidateSource(#[from] CandidateSourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Cycle cancelled")]
    Cancelled,
}

impl CycleError {
    /// Report category, or `None` for cancellation which is not reported.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::CandidateSource(_) => Some(FailureKind::CandidateSource),
            Self::Store(_) => Some(FailureKind::Store),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
