//! Per-cycle change sets between two canonical membership states.

use serde::{Deserialize, Serialize};

use super::candidate::Role;
use super::community::CanonicalCommunity;

/// Sub-type of a newly observed membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Plain membership.
    Joined,
    /// Admin/creator on first sight, reported as a creation.
    Created,
}

impl JoinKind {
    pub fn for_role(role: Role) -> Self {
        if role.implies_creation() {
            Self::Created
        } else {
            Self::Joined
        }
    }
}

/// A community present now but absent from the previous snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedEntry {
    pub kind: JoinKind,
    pub community: CanonicalCommunity,
}

/// A role transition on a community present in both states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleChange {
    pub id: String,
    pub display_name: String,
    pub old_role: Role,
    pub new_role: Role,
    /// Current-cycle confidence of the community.
    pub confidence: f64,
}

impl RoleChange {
    pub fn is_promotion(&self) -> bool {
        self.new_role > self.old_role
    }
}

/// A non-role attribute change on a common community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldChange {
    DisplayName { old: String, new: String },
    Confidence { old: f64, new: f64 },
}

impl FieldChange {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::DisplayName { .. } => "display_name",
            Self::Confidence { .. } => "confidence",
        }
    }
}

/// Material non-role changes to a common community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityUpdate {
    pub community: CanonicalCommunity,
    pub changes: Vec<FieldChange>,
}

/// Result of comparing the previous snapshot with the current canonical set.
///
/// Every id from either side lands in exactly one of `joined`, `left`,
/// or `common`; `role_changed` and `updated` are refinements of `common`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub joined: Vec<JoinedEntry>,
    pub left: Vec<CanonicalCommunity>,
    pub role_changed: Vec<RoleChange>,
    pub updated: Vec<CommunityUpdate>,
    pub common: Vec<String>,
}

impl DiffResult {
    /// True when there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty()
            && self.left.is_empty()
            && self.role_changed.is_empty()
            && self.updated.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.joined.len() + self.left.len() + self.role_changed.len() + self.updated.len()
    }

    pub fn joined_of(&self, kind: JoinKind) -> impl Iterator<Item = &JoinedEntry> {
        self.joined.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn joined_ids(&self) -> Vec<String> {
        self.joined_of(JoinKind::Joined)
            .map(|entry| entry.community.id.clone())
            .collect()
    }

    pub fn created_ids(&self) -> Vec<String> {
        self.joined_of(JoinKind::Created)
            .map(|entry| entry.community.id.clone())
            .collect()
    }

    pub fn left_ids(&self) -> Vec<String> {
        self.left.iter().map(|c| c.id.clone()).collect()
    }

    pub fn role_changed_ids(&self) -> Vec<String> {
        self.role_changed.iter().map(|c| c.id.clone()).collect()
    }

    /// Every id that appears in a change bucket.
    pub fn visible_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .joined
            .iter()
            .map(|e| e.community.id.clone())
            .chain(self.left.iter().map(|c| c.id.clone()))
            .chain(self.role_changed.iter().map(|c| c.id.clone()))
            .chain(self.updated.iter().map(|u| u.community.id.clone()))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Counts of entries hidden by the confidence filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressedCounts {
    pub joined: usize,
    pub left: usize,
    pub role_changed: usize,
    pub updated: usize,
}

impl SuppressedCounts {
    pub fn total(&self) -> usize {
        self.joined + self.left + self.role_changed + self.updated
    }
}
