//! Set difference between the committed snapshot and the current cycle.

use crate::domain::models::{
    CanonicalCommunity, CommunityUpdate, DiffResult, FieldChange, JoinKind, JoinedEntry, RoleChange,
    ScoringConfig, Snapshot,
};

/// Float slack so a delta of exactly the threshold counts as material.
const DELTA_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct DiffEngine {
    material_confidence_delta: f64,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl DiffEngine {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            material_confidence_delta: config.material_confidence_delta,
        }
    }

    fn is_material(&self, old: f64, new: f64) -> bool {
        (new - old).abs() + DELTA_EPSILON >= self.material_confidence_delta
    }

    fn field_changes(&self, old: &CanonicalCommunity, new: &CanonicalCommunity) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if old.display_name != new.display_name {
            changes.push(FieldChange::DisplayName {
                old: old.display_name.clone(),
                new: new.display_name.clone(),
            });
        }
        if self.is_material(old.confidence, new.confidence) {
            changes.push(FieldChange::Confidence {
                old: old.confidence,
                new: new.confidence,
            });
        }
        changes
    }

    /// Compare `previous` with `current`.
    ///
    /// Every id of either side ends up in exactly one of joined, left or
    /// common. Results are ordered by id.
    pub fn diff(&self, previous: &Snapshot, current: &Snapshot) -> DiffResult {
        let mut result = DiffResult::default();

        for (id, community) in &current.communities {
            let Some(prior) = previous.communities.get(id) else {
                result.joined.push(JoinedEntry {
                    kind: JoinKind::for_role(community.role),
                    community: community.clone(),
                });
                continue;
            };

            result.common.push(id.clone());

            if prior.role != community.role {
                result.role_changed.push(RoleChange {
                    id: id.clone(),
                    display_name: community.display_name.clone(),
                    old_role: prior.role,
                    new_role: community.role,
                    confidence: community.confidence,
                });
            }

            let changes = self.field_changes(prior, community);
            if !changes.is_empty() {
                result.updated.push(CommunityUpdate {
                    community: community.clone(),
                    changes,
                });
            }
        }

        result.left = previous
            .communities
            .iter()
            .filter(|(id, _)| !current.communities.contains_key(*id))
            .map(|(_, community)| community.clone())
            .collect();

        result
    }
}
