//! Presentation-only filtering of low-trust changes.
//!
//! The filter decides what a report shows. It never decides what the
//! snapshot stores: hidden entries are committed like any other and only
//! counted as suppressed.

use std::collections::BTreeSet;

use crate::domain::models::{
    DiffResult, FilterConfig, JoinKind, JoinedEntry, Snapshot, SuppressedCounts,
};

/// Diff split into what is shown and what is hidden.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredDiff {
    /// Entries at or above the threshold.
    pub visible: DiffResult,

    /// Per-bucket counts of hidden entries.
    pub suppressed: SuppressedCounts,

    /// Ids surfaced in a report so far, to persist with the new snapshot.
    pub reported: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct ConfidenceFilter {
    min_confidence: f64,
    filter_left: bool,
}

impl Default for ConfidenceFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl ConfidenceFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            filter_left: config.filter_left,
        }
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    fn passes(&self, confidence: f64) -> bool {
        confidence >= self.min_confidence
    }

    /// Filter `diff` computed from `previous` to `current`.
    ///
    /// A common community that was never reported and now passes the
    /// threshold is shown as joined, absorbing its role and field changes.
    pub fn apply(&self, diff: DiffResult, previous: &Snapshot, current: &Snapshot) -> FilteredDiff {
        let mut visible = DiffResult {
            common: diff.common,
            ..DiffResult::default()
        };
        let mut suppressed = SuppressedCounts::default();

        for entry in diff.joined {
            if self.passes(entry.community.confidence) {
                visible.joined.push(entry);
            } else {
                suppressed.joined += 1;
            }
        }

        let mut promoted = BTreeSet::new();
        for id in &visible.common {
            if previous.was_reported(id) {
                continue;
            }
            if let Some(community) = current.get(id) {
                if self.passes(community.confidence) {
                    promoted.insert(id.clone());
                    visible.joined.push(JoinedEntry {
                        kind: JoinKind::for_role(community.role),
                        community: community.clone(),
                    });
                }
            }
        }
        visible.joined.sort_by(|a, b| a.community.id.cmp(&b.community.id));

        for change in diff.role_changed {
            if promoted.contains(&change.id) {
                continue;
            }
            if self.passes(change.confidence) {
                visible.role_changed.push(change);
            } else {
                suppressed.role_changed += 1;
            }
        }

        for update in diff.updated {
            if promoted.contains(&update.community.id) {
                continue;
            }
            if self.passes(update.community.confidence) {
                visible.updated.push(update);
            } else {
                suppressed.updated += 1;
            }
        }

        for community in diff.left {
            if !self.filter_left || self.passes(community.confidence) {
                visible.left.push(community);
            } else {
                suppressed.left += 1;
            }
        }

        let reported = previous
            .reported
            .iter()
            .filter(|id| current.communities.contains_key(*id))
            .cloned()
            .chain(visible.joined.iter().map(|entry| entry.community.id.clone()))
            .collect();

        FilteredDiff {
            visible,
            suppressed,
            reported,
        }
    }
}
