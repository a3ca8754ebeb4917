//! Canonical, deduplicated membership records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::{DetectionMethod, Role};

/// A merged membership record, rebuilt from scratch every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CanonicalCommunity {
    /// Dedup key, unique within one cycle's output.
    pub id: String,

    /// Name taken from the highest-scored candidate in the cluster.
    pub display_name: String,

    /// Highest-authority role observed in the cluster.
    pub role: Role,

    /// Aggregated trust in [0, 1].
    pub confidence: f64,

    /// Number of distinct detection methods that contributed.
    pub source_count: u32,

    /// Earliest observation of this community.
    pub first_seen_at: DateTime<Utc>,

    /// Latest observation of this community.
    pub last_seen_at: DateTime<Utc>,

    /// Distinct detection methods, sorted.
    #[serde(default)]
    pub methods: Vec<DetectionMethod>,

    /// Distinct detector source ids that were merged, sorted.
    #[serde(default)]
    pub source_ids: Vec<String>,
}

impl CanonicalCommunity {
    /// Whether more than one detection method corroborates this record.
    pub fn is_corroborated(&self) -> bool {
        self.source_count >= 2
    }

    /// Comma-separated method list for display.
    pub fn methods_label(&self) -> String {
        if self.methods.is_empty() {
            return "unknown".to_string();
        }
        self.methods
            .iter()
            .map(DetectionMethod::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
