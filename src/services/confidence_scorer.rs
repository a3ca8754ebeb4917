//! Confidence scoring for candidates and merged clusters.
//!
//! Confidence is a pure function of the current cycle's evidence: each
//! detection method has a configured base tier, a cluster takes the best
//! tier among its members, and agreement between distinct methods earns a
//! fixed bonus. Nothing is carried over or decayed between cycles.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::models::{Candidate, DetectionMethod, ScoringConfig};

/// Number of distinct methods required before the corroboration bonus applies.
const CORROBORATION_THRESHOLD: usize = 2;

#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    method_confidence: BTreeMap<String, f64>,
    corroboration_bonus: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl ConfidenceScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            method_confidence: config.method_confidence.clone(),
            corroboration_bonus: config.corroboration_bonus,
        }
    }

    /// Configured tier for a method, if any.
    pub fn method_tier(&self, method: &DetectionMethod) -> Option<f64> {
        self.method_confidence.get(method.as_str()).copied()
    }

    /// Base confidence of a single candidate.
    ///
    /// Methods without a configured tier fall back to the detector's own
    /// reported confidence.
    pub fn base_confidence(&self, candidate: &Candidate) -> f64 {
        self.method_tier(&candidate.method)
            .unwrap_or(candidate.confidence)
            .clamp(0.0, 1.0)
    }

    /// Aggregate confidence of a cluster of candidates.
    pub fn score_cluster<'a, I>(&self, members: I) -> f64
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let mut best = 0.0_f64;
        let mut methods = BTreeSet::new();
        for candidate in members {
            best = best.max(self.base_confidence(candidate));
            methods.insert(candidate.method.as_str());
        }

        if methods.len() >= CORROBORATION_THRESHOLD {
            (best + self.corroboration_bonus).min(1.0)
        } else {
            best
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Role;
    use chrono::Utc;

    fn candidate(method: &str, confidence: f64) -> Candidate {
        Candidate::new("c1", "Rustaceans", Role::Member, method, confidence, Utc::now())
    }

    #[test]
    fn test_base_confidence_uses_method_tier() {
        let scorer = ConfidenceScorer::default();
        assert!((scorer.base_confidence(&candidate("direct_dom_element", 0.1)) - 0.98).abs() < 1e-9);
        assert!((scorer.base_confidence(&candidate("social_graph_inference", 0.99)) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_method_falls_back_to_reported() {
        let scorer = ConfidenceScorer::default();
        assert!((scorer.base_confidence(&candidate("bio_scan", 0.72)) - 0.72).abs() < 1e-9);
    }

    #[test]
    fn test_single_method_gets_no_bonus() {
        let scorer = ConfidenceScorer::default();
        let members = [candidate("hashtag_pattern", 0.5), candidate("hashtag_pattern", 0.5)];
        assert!((scorer.score_cluster(&members) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_distinct_methods_add_bonus() {
        let scorer = ConfidenceScorer::default();
        let members = [candidate("hashtag_pattern", 0.5), candidate("mention_pattern", 0.5)];
        assert!((scorer.score_cluster(&members) - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_bonus_is_capped() {
        let scorer = ConfidenceScorer::default();
        let members = [candidate("direct_dom_element", 0.9), candidate("direct_id_url", 0.9)];
        assert!((scorer.score_cluster(&members) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_table() {
        let mut config = ScoringConfig::default();
        config.method_confidence.insert("bio_scan".to_string(), 0.3);
        config.corroboration_bonus = 0.2;
        let scorer = ConfidenceScorer::new(&config);

        let members = [candidate("bio_scan", 0.9), candidate("mention_pattern", 0.9)];
        assert!((scorer.score_cluster(&members) - 0.85).abs() < 1e-9);
    }
}
