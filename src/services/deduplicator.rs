//! Candidate deduplication and merging.
//!
//! All candidates for one subject in one cycle are clustered with a
//! disjoint-set forest over three merge predicates:
//!
//! 1. identical `source_id`
//! 2. identical embedded platform id (a run of at least 15 digits)
//! 3. fuzzy equality of normalized names (normalized Levenshtein > 0.8)
//!
//! Because unions are transitive and every representative choice uses a
//! total order over candidate content, the output does not depend on the
//! order candidates arrive in.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::errors::ValidationError;
use crate::domain::models::{Candidate, CanonicalCommunity};
use crate::services::confidence_scorer::ConfidenceScorer;

/// Minimum digit run treated as a platform id.
static PLATFORM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{15,}").expect("platform id pattern is valid"));

/// Detector-specific decorations around ids.
const ID_PREFIXES: &[&str] = &[
    "https://x.com/i/communities/",
    "https://twitter.com/i/communities/",
    "x.com/i/communities/",
    "twitter.com/i/communities/",
    "communities/",
    "community_",
    "social_",
    "graphql_",
    "dom_",
    "url_",
    "id_",
];

const ID_SUFFIXES: &[&str] = &["/about", "/members", "/moderators", "/"];

/// Name tokens that carry no identity.
const NAME_STOPWORDS: &[&str] = &[
    "the",
    "community",
    "communities",
    "dao",
    "group",
    "collective",
    "club",
];

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;
const DEFAULT_MIN_NAME_LEN: usize = 3;

/// Normalize a community name for fuzzy comparison.
///
/// Lowercases, splits on anything that is not alphanumeric (which drops
/// `#` and `@`), and removes generic tokens such as "community" or "the".
pub fn normalize_name(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !NAME_STOPWORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_affixes(raw: &str) -> &str {
    let mut value = raw.trim();
    for prefix in ID_PREFIXES {
        if let Some(rest) = value.strip_prefix(prefix) {
            value = rest;
            break;
        }
    }
    for suffix in ID_SUFFIXES {
        if let Some(rest) = value.strip_suffix(suffix) {
            value = rest;
            break;
        }
    }
    value
}

/// Extract an embedded platform id from a candidate's source id, or failing
/// that from its name.
pub fn extract_platform_id(candidate: &Candidate) -> Option<String> {
    [candidate.source_id.as_str(), candidate.raw_name.as_str()]
        .into_iter()
        .find_map(|field| PLATFORM_ID.find(strip_affixes(field)))
        .map(|m| m.as_str().to_string())
}

/// Disjoint-set forest with path compression and union by rank.
#[derive(Debug)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            Ordering::Less => self.parent[ra] = rb,
            Ordering::Greater => self.parent[rb] = ra,
            Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Candidates judged to describe the same community.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCluster {
    pub members: Vec<Candidate>,
}

/// A candidate dropped before clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub candidate: Candidate,
    pub reason: ValidationError,
}

/// Clusters plus the candidates that never made it in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clustering {
    pub clusters: Vec<CandidateCluster>,
    pub rejected: Vec<RejectedCandidate>,
}

/// Canonical communities for one cycle, sorted by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub communities: Vec<CanonicalCommunity>,
    pub rejected: Vec<RejectedCandidate>,
}

/// Total order used for every representative choice in a cluster.
fn candidate_order(a: &Candidate, b: &Candidate) -> Ordering {
    a.source_id
        .cmp(&b.source_id)
        .then_with(|| a.raw_name.cmp(&b.raw_name))
        .then_with(|| a.method.cmp(&b.method))
        .then_with(|| a.role.cmp(&b.role))
        .then_with(|| a.observed_at.cmp(&b.observed_at))
        .then_with(|| a.confidence.total_cmp(&b.confidence))
}

#[derive(Debug, Clone)]
pub struct Deduplicator {
    similarity_threshold: f64,
    min_name_len: usize,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_name_len: DEFAULT_MIN_NAME_LEN,
        }
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the fuzzy-name similarity threshold (exclusive).
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Check a candidate and return its normalized name.
    fn admit(&self, candidate: &Candidate) -> Result<String, ValidationError> {
        candidate.validate()?;
        let normalized = normalize_name(&candidate.raw_name);
        if normalized.chars().count() < self.min_name_len {
            return Err(ValidationError::NameTooShort {
                source_id: candidate.source_id.clone(),
            });
        }
        Ok(normalized)
    }

    /// Partition candidates into clusters of the same community.
    pub fn cluster(&self, candidates: Vec<Candidate>) -> Clustering {
        let mut admitted = Vec::with_capacity(candidates.len());
        let mut names = Vec::with_capacity(candidates.len());
        let mut rejected = Vec::new();

        for mut candidate in candidates {
            match self.admit(&candidate) {
                Ok(name) => {
                    // Merging and the canonical id key on the trimmed source id.
                    let trimmed = candidate.source_id.trim();
                    if trimmed.len() != candidate.source_id.len() {
                        candidate.source_id = trimmed.to_string();
                    }
                    names.push(name);
                    admitted.push(candidate);
                }
                Err(reason) => {
                    debug!(source_id = %candidate.source_id, %reason, "dropping candidate");
                    rejected.push(RejectedCandidate { candidate, reason });
                }
            }
        }

        let mut sets = DisjointSet::new(admitted.len());
        self.union_matches(&admitted, &names, &mut sets);

        let mut groups: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
        for (idx, candidate) in admitted.into_iter().enumerate() {
            groups.entry(sets.find(idx)).or_default().push(candidate);
        }

        let clusters = groups
            .into_values()
            .map(|mut members| {
                members.sort_by(candidate_order);
                CandidateCluster { members }
            })
            .collect();

        Clustering { clusters, rejected }
    }

    /// Apply the three merge predicates to admitted candidates.
    fn union_matches(&self, admitted: &[Candidate], names: &[String], sets: &mut DisjointSet) {
        let mut by_source: HashMap<&str, usize> = HashMap::new();
        let mut by_platform: HashMap<String, usize> = HashMap::new();
        let mut by_name: BTreeMap<&str, usize> = BTreeMap::new();

        for (idx, candidate) in admitted.iter().enumerate() {
            if let Some(&first) = by_source.get(candidate.source_id.as_str()) {
                sets.union(first, idx);
            } else {
                by_source.insert(candidate.source_id.as_str(), idx);
            }

            if let Some(platform_id) = extract_platform_id(candidate) {
                if let Some(&first) = by_platform.get(&platform_id) {
                    sets.union(first, idx);
                } else {
                    by_platform.insert(platform_id, idx);
                }
            }

            if let Some(&first) = by_name.get(names[idx].as_str()) {
                sets.union(first, idx);
            } else {
                by_name.insert(names[idx].as_str(), idx);
            }
        }

        let distinct: Vec<(&str, usize)> = by_name.into_iter().collect();
        for (i, (name_a, idx_a)) in distinct.iter().enumerate() {
            for (name_b, idx_b) in &distinct[i + 1..] {
                if strsim::normalized_levenshtein(name_a, name_b) > self.similarity_threshold {
                    sets.union(*idx_a, *idx_b);
                }
            }
        }
    }

    /// Collapse a cluster into a single canonical record, or `None` for an empty cluster.
    pub fn canonicalize(&self, cluster: &CandidateCluster, scorer: &ConfidenceScorer) -> Option<CanonicalCommunity> {
        let mut ranked: Vec<(f64, &Candidate)> = cluster
            .members
            .iter()
            .map(|c| (scorer.base_confidence(c), c))
            .collect();
        ranked.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| candidate_order(a, b)));

        let top = ranked.first()?.1;
        let id = ranked
            .iter()
            .find_map(|(_, c)| extract_platform_id(c))
            .unwrap_or_else(|| top.source_id.clone());

        let role = cluster
            .members
            .iter()
            .map(|c| c.role)
            .max()
            .unwrap_or_default();

        let methods: BTreeSet<_> = cluster.members.iter().map(|c| c.method.clone()).collect();
        let source_ids: BTreeSet<_> = cluster.members.iter().map(|c| c.source_id.clone()).collect();

        let first_seen_at = cluster.members.iter().map(|c| c.observed_at).min().unwrap_or(top.observed_at);
        let last_seen_at = cluster.members.iter().map(|c| c.observed_at).max().unwrap_or(top.observed_at);

        Some(CanonicalCommunity {
            id,
            display_name: top.raw_name.trim().to_string(),
            role,
            confidence: scorer.score_cluster(&cluster.members),
            source_count: u32::try_from(methods.len()).unwrap_or(u32::MAX),
            first_seen_at,
            last_seen_at,
            methods: methods.into_iter().collect(),
            source_ids: source_ids.into_iter().collect(),
        })
    }

    /// Cluster, score and canonicalize one cycle's candidates.
    pub fn merge(&self, candidates: Vec<Candidate>, scorer: &ConfidenceScorer) -> MergeOutcome {
        let Clustering { clusters, rejected } = self.cluster(candidates);

        let mut communities: Vec<CanonicalCommunity> = clusters
            .iter()
            .filter_map(|cluster| self.canonicalize(cluster, scorer))
            .collect();
        communities.sort_by(|a, b| a.id.cmp(&b.id));

        MergeOutcome { communities, rejected }
    }
}
