//! Port for detectors that observe a subject's memberships.

use async_trait::async_trait;

use crate::domain::errors::CandidateSourceError;
use crate::domain::models::Candidate;

/// Produces unordered candidate observations for a subject.
///
/// Implementations own their own transport, credentials and timeouts; a
/// timeout must surface as `CandidateSourceError::Timeout` so the scheduler
/// treats it as an ordinary recoverable failure.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Fetch this cycle's candidates for a subject.
    async fn fetch_candidates(&self, subject_id: &str) -> Result<Vec<Candidate>, CandidateSourceError>;
}
