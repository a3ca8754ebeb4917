//! Property-based tests for merging, diffing and filtering.

mod common;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use proptest::prelude::*;

use common::{at, community};
use memberscan::domain::models::{Candidate, FilterConfig, Role, Snapshot};
use memberscan::services::deduplicator::extract_platform_id;
use memberscan::services::{ConfidenceFilter, ConfidenceScorer, Deduplicator, DiffEngine};

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Member),
        Just(Role::Moderator),
        Just(Role::Admin),
        Just(Role::Creator),
    ]
}

fn candidate_strategy() -> impl Strategy<Value = Candidate> {
    let source_ids = prop::sample::select(vec![
        "c1",
        "c1 ",
        " c2",
        "c2",
        "c3",
        "c4",
        "social_1493446837214187523",
        "https://x.com/i/communities/1493446837214187523",
        "dom_1700000000000000001",
    ]);
    let names = prop::sample::select(vec![
        "Rust Builders",
        "rust builders",
        "Rust Builder",
        "Solana Devs",
        "Build in Public",
        "#BuildInPublic",
        "Indie Hackers",
        "The Club",
        "x",
    ]);
    let methods = prop::sample::select(vec!["dom", "url", "graphql", "hashtag", "detector"]);

    (source_ids, names, role_strategy(), methods, 0.0f64..=1.0, 0i64..600).prop_map(
        |(source_id, name, role, method, confidence, offset)| {
            Candidate::new(source_id, name, role, method, confidence, at(offset))
        },
    )
}

fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    let ids = prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]);
    prop::collection::btree_map(ids, (role_strategy(), 0.0f64..=1.0, any::<bool>()), 0..6).prop_map(
        |entries: BTreeMap<&str, (Role, f64, bool)>| {
            let mut snapshot = Snapshot::from_communities(
                "alice",
                at(0),
                entries
                    .iter()
                    .map(|(id, (role, confidence, _))| community(id, &format!("Community {id}"), *role, *confidence)),
            );
            snapshot.reported = entries
                .iter()
                .filter(|(_, (_, _, reported))| *reported)
                .map(|(id, _)| (*id).to_string())
                .collect();
            snapshot
        },
    )
}

proptest! {
    /// Property: every id lands in exactly one of joined, left, or common
    #[test]
    fn prop_diff_is_total(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let diff = DiffEngine::default().diff(&previous, &current);

        let joined: BTreeSet<_> = diff.joined.iter().map(|e| e.community.id.clone()).collect();
        let left: BTreeSet<_> = diff.left.iter().map(|c| c.id.clone()).collect();
        let common: BTreeSet<_> = diff.common.iter().cloned().collect();

        prop_assert!(joined.is_disjoint(&left));
        prop_assert!(joined.is_disjoint(&common));
        prop_assert!(left.is_disjoint(&common));

        let all: BTreeSet<String> = previous
            .communities
            .keys()
            .chain(current.communities.keys())
            .cloned()
            .collect();
        let covered: BTreeSet<String> = joined.union(&left).chain(common.iter()).cloned().collect();
        prop_assert_eq!(all, covered);

        for change in &diff.role_changed {
            prop_assert!(common.contains(&change.id));
        }
    }

    /// Property: a snapshot diffed against itself has no changes
    #[test]
    fn prop_self_diff_is_empty(snapshot in snapshot_strategy()) {
        let diff = DiffEngine::default().diff(&snapshot, &snapshot);
        prop_assert!(diff.is_empty());
        prop_assert_eq!(diff.common.len(), snapshot.len());
    }

    /// Property: canonical entries never share a source id or platform id
    #[test]
    fn prop_merge_closure(candidates in prop::collection::vec(candidate_strategy(), 0..16)) {
        let outcome = Deduplicator::new().merge(candidates.clone(), &ConfidenceScorer::default());

        let mut seen_sources = HashSet::new();
        for entry in &outcome.communities {
            for source_id in &entry.source_ids {
                prop_assert!(seen_sources.insert(source_id.clone()), "source id {} in two entries", source_id);
            }
        }

        let mut seen_platform = HashSet::new();
        for entry in &outcome.communities {
            let ids: BTreeSet<String> = candidates
                .iter()
                .filter(|c| entry.source_ids.iter().any(|id| id == c.source_id.trim()))
                .filter_map(extract_platform_id)
                .collect();
            for id in ids {
                prop_assert!(seen_platform.insert(id.clone()), "platform id {} in two entries", id);
            }
        }

        for entry in &outcome.communities {
            prop_assert!((0.0..=1.0).contains(&entry.confidence));
        }
        let ids: BTreeSet<_> = outcome.communities.iter().map(|c| c.id.as_str()).collect();
        prop_assert_eq!(ids.len(), outcome.communities.len());

        // No community is lost when the merged list becomes a snapshot.
        let snapshot = Snapshot::from_communities("alice", at(0), outcome.communities.clone());
        prop_assert_eq!(snapshot.len(), outcome.communities.len());
    }

    /// Property: merge output does not depend on arrival order
    #[test]
    fn prop_merge_order_independent(
        (candidates, shuffled) in prop::collection::vec(candidate_strategy(), 0..12)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let scorer = ConfidenceScorer::default();
        let dedup = Deduplicator::new();
        let a = dedup.merge(candidates, &scorer);
        let b = dedup.merge(shuffled, &scorer);
        prop_assert_eq!(a.communities, b.communities);
        prop_assert_eq!(a.rejected.len(), b.rejected.len());
    }

    /// Property: lowering the threshold never hides a visible entry
    #[test]
    fn prop_filter_monotonic(
        previous in snapshot_strategy(),
        current in snapshot_strategy(),
        low in 0.0f64..=1.0,
        raise in 0.0f64..=1.0,
        filter_left in any::<bool>(),
    ) {
        let high = (low + raise).min(1.0);
        let diff = DiffEngine::default().diff(&previous, &current);

        let strict = ConfidenceFilter::new(&FilterConfig { min_confidence: high, filter_left })
            .apply(diff.clone(), &previous, &current);
        let lenient = ConfidenceFilter::new(&FilterConfig { min_confidence: low, filter_left })
            .apply(diff, &previous, &current);

        let strict_ids: BTreeSet<String> = strict.visible.visible_ids().into_iter().collect();
        let lenient_ids: BTreeSet<String> = lenient.visible.visible_ids().into_iter().collect();
        prop_assert!(strict_ids.is_subset(&lenient_ids));
        prop_assert!(lenient.suppressed.total() <= strict.suppressed.total());
    }
}
