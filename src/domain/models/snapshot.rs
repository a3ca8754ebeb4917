//! Committed membership state per subject.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::Role;
use super::community::CanonicalCommunity;

/// Accepted membership state as of the end of a successful cycle.
///
/// Exactly one snapshot is committed per subject; stores replace it as a
/// whole, never field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Snapshot {
    pub subject_id: String,
    pub as_of: DateTime<Utc>,
    pub communities: BTreeMap<String, CanonicalCommunity>,
    /// Ids that have been surfaced in a visible report at least once.
    #[serde(default)]
    pub reported: BTreeSet<String>,
}

impl Snapshot {
    /// Snapshot with no communities, used on a subject's first cycle.
    pub fn empty(subject_id: impl Into<String>, as_of: DateTime<Utc>) -> Self {
        Self {
            subject_id: subject_id.into(),
            as_of,
            communities: BTreeMap::new(),
            reported: BTreeSet::new(),
        }
    }

    /// Build a snapshot from a canonical list, keyed by id.
    pub fn from_communities(
        subject_id: impl Into<String>,
        as_of: DateTime<Utc>,
        communities: impl IntoIterator<Item = CanonicalCommunity>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            as_of,
            communities: communities.into_iter().map(|c| (c.id.clone(), c)).collect(),
            reported: BTreeSet::new(),
        }
    }

    /// Mark every community as already reported.
    pub fn with_all_reported(mut self) -> Self {
        self.reported = self.communities.keys().cloned().collect();
        self
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CanonicalCommunity> {
        self.communities.get(id)
    }

    pub fn ids(&self) -> BTreeSet<&str> {
        self.communities.keys().map(String::as_str).collect()
    }

    pub fn was_reported(&self, id: &str) -> bool {
        self.reported.contains(id)
    }

    /// Community counts per role.
    pub fn role_totals(&self) -> BTreeMap<Role, usize> {
        let mut totals = BTreeMap::new();
        for community in self.communities.values() {
            *totals.entry(community.role).or_insert(0) += 1;
        }
        totals
    }

    /// Keep `first_seen_at` from an earlier snapshot for communities that
    /// were already known. Nothing else is carried across cycles.
    pub fn carry_first_seen(&mut self, previous: &Self) {
        for (id, community) in &mut self.communities {
            if let Some(prior) = previous.communities.get(id) {
                if prior.first_seen_at < community.first_seen_at {
                    community.first_seen_at = prior.first_seen_at;
                }
            }
        }
    }
}
