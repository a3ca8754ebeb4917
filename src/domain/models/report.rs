//! Outward-facing change reports and the run history record.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::Role;
use super::diff::{DiffResult, SuppressedCounts};

/// Current membership totals attached to every successful report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTotals {
    pub communities: usize,
    pub by_role: BTreeMap<Role, usize>,
}

/// Category of a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CandidateSource,
    Store,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CandidateSource => "candidate_source",
            Self::Store => "store",
        }
    }
}

/// What a cycle produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReportBody {
    /// Visible changes after filtering.
    Changes {
        diff: DiffResult,
        suppressed: SuppressedCounts,
        totals: MembershipTotals,
    },
    /// Cycle completed and nothing visible changed.
    NoChanges {
        suppressed: SuppressedCounts,
        totals: MembershipTotals,
    },
    /// Cycle failed before committing state.
    Failed {
        kind: FailureKind,
        message: String,
        #[serde(with = "duration_millis_opt")]
        retry_in: Option<Duration>,
    },
}

/// One report per cycle, published to the notification sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub subject_id: String,
    pub generated_at: DateTime<Utc>,
    pub body: ReportBody,
}

impl ChangeReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.body, ReportBody::Failed { .. })
    }

    pub fn has_changes(&self) -> bool {
        matches!(self.body, ReportBody::Changes { .. })
    }

    pub fn diff(&self) -> Option<&DiffResult> {
        match &self.body {
            ReportBody::Changes { diff, .. } => Some(diff),
            _ => None,
        }
    }

    pub fn totals(&self) -> Option<&MembershipTotals> {
        match &self.body {
            ReportBody::Changes { totals, .. } | ReportBody::NoChanges { totals, .. } => Some(totals),
            ReportBody::Failed { .. } => None,
        }
    }

    pub fn suppressed(&self) -> SuppressedCounts {
        match &self.body {
            ReportBody::Changes { suppressed, .. } | ReportBody::NoChanges { suppressed, .. } => {
                *suppressed
            }
            ReportBody::Failed { .. } => SuppressedCounts::default(),
        }
    }
}

/// Final status of a recorded scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// History entry for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRun {
    pub id: Uuid,
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub joined_ids: Vec<String>,
    pub created_ids: Vec<String>,
    pub left_ids: Vec<String>,
    pub role_changed_ids: Vec<String>,
    pub suppressed: u32,
    pub error: Option<String>,
}

impl ScanRun {
    /// Run record for a cycle that committed its snapshot.
    pub fn completed(
        subject_id: &str,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        diff: &DiffResult,
        suppressed: SuppressedCounts,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            started_at,
            finished_at,
            status: RunStatus::Completed,
            joined_ids: diff.joined_ids(),
            created_ids: diff.created_ids(),
            left_ids: diff.left_ids(),
            role_changed_ids: diff.role_changed_ids(),
            suppressed: u32::try_from(suppressed.total()).unwrap_or(u32::MAX),
            error: None,
        }
    }

    /// Run record for a cycle that aborted.
    pub fn failed(
        subject_id: &str,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            started_at,
            finished_at,
            status: RunStatus::Failed,
            joined_ids: vec![],
            created_ids: vec![],
            left_ids: vec![],
            role_changed_ids: vec![],
            suppressed: 0,
            error: Some(error.into()),
        }
    }
}

mod duration_millis_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
