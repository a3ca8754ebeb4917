//! Fan-out over several detectors.
//!
//! Every detector is polled concurrently under its own timeout. A failing
//! detector does not abort its siblings; the cycle only fails when every
//! detector failed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::domain::errors::CandidateSourceError;
use crate::domain::models::Candidate;
use crate::domain::ports::CandidateSource;

pub struct CompositeCandidateSource {
    sources: Vec<Arc<dyn CandidateSource>>,
    timeout: Duration,
}

impl CompositeCandidateSource {
    pub fn new(sources: Vec<Arc<dyn CandidateSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    async fn fetch_one(
        &self,
        source: &Arc<dyn CandidateSource>,
        subject_id: &str,
    ) -> Result<Vec<Candidate>, CandidateSourceError> {
        match tokio::time::timeout(self.timeout, source.fetch_candidates(subject_id)).await {
            Ok(result) => result,
            Err(_) => Err(CandidateSourceError::Timeout {
                source_name: source.name().to_string(),
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl CandidateSource for CompositeCandidateSource {
    fn name(&self) -> &str {
        "composite"
    }

    async fn fetch_candidates(&self, subject_id: &str) -> Result<Vec<Candidate>, CandidateSourceError> {
        let results = join_all(
            self.sources
                .iter()
                .map(|source| self.fetch_one(source, subject_id)),
        )
        .await;

        let mut candidates = Vec::new();
        let mut failures = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(mut found) => candidates.append(&mut found),
                Err(e) => {
                    warn!(subject_id, source = source.name(), error = %e, "Candidate source failed");
                    failures.push(e.to_string());
                }
            }
        }

        if !self.sources.is_empty() && failures.len() == self.sources.len() {
            return Err(CandidateSourceError::AllSourcesFailed {
                subject_id: subject_id.to_string(),
                count: failures.len(),
                messages: failures,
            });
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Role;
    use chrono::Utc;

    struct Fixed(&'static str, Result<usize, ()>);

    #[async_trait]
    impl CandidateSource for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch_candidates(&self, _subject_id: &str) -> Result<Vec<Candidate>, CandidateSourceError> {
            match self.1 {
                Ok(n) => Ok((0..n)
                    .map(|i| Candidate::new(format!("{}-{i}", self.0), "Rustaceans", Role::Member, "dom", 0.9, Utc::now()))
                    .collect()),
                Err(()) => Err(CandidateSourceError::failed(self.0, "boom")),
            }
        }
    }

    struct Stalled;

    #[async_trait]
    impl CandidateSource for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn fetch_candidates(&self, _subject_id: &str) -> Result<Vec<Candidate>, CandidateSourceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_siblings() {
        let composite = CompositeCandidateSource::new(
            vec![Arc::new(Fixed("dom", Ok(2))), Arc::new(Fixed("graphql", Err(())))],
            Duration::from_secs(5),
        );
        let candidates = composite.fetch_candidates("alice").await.unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_all_failed() {
        let composite = CompositeCandidateSource::new(
            vec![Arc::new(Fixed("dom", Err(()))), Arc::new(Fixed("graphql", Err(())))],
            Duration::from_secs(5),
        );
        let err = composite.fetch_candidates("alice").await.unwrap_err();
        assert!(matches!(err, CandidateSourceError::AllSourcesFailed { count: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let composite = CompositeCandidateSource::new(
            vec![Arc::new(Stalled), Arc::new(Fixed("dom", Ok(1)))],
            Duration::from_secs(60),
        );
        let candidates = composite.fetch_candidates("alice").await.unwrap();
        assert_eq!(candidates.len(), 1);

        let only_stalled = CompositeCandidateSource::new(vec![Arc::new(Stalled)], Duration::from_secs(60));
        let err = only_stalled.fetch_candidates("alice").await.unwrap_err();
        match err {
            CandidateSourceError::AllSourcesFailed { messages, .. } => {
                assert!(messages[0].contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
