//! Rate-limit decorator for candidate sources.
//!
//! Detectors usually share one credential or proxy pool, so a single
//! limiter is built from configuration and handed to every wrapped source.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::domain::errors::CandidateSourceError;
use crate::domain::models::{Candidate, RateLimitConfig};
use crate::domain::ports::CandidateSource;

pub type SharedRateLimiter = Arc<DefaultDirectRateLimiter>;

/// Build a limiter for `config`, falling back to one request per second
/// when the configured rate is unusable.
pub fn shared_rate_limiter(config: &RateLimitConfig) -> SharedRateLimiter {
    let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
    let quota = Duration::try_from_secs_f64(1.0 / config.requests_per_second)
        .ok()
        .and_then(Quota::with_period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst);
    Arc::new(RateLimiter::direct(quota))
}

pub struct RateLimitedSource {
    inner: Arc<dyn CandidateSource>,
    limiter: SharedRateLimiter,
}

impl RateLimitedSource {
    pub fn new(inner: Arc<dyn CandidateSource>, limiter: SharedRateLimiter) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl CandidateSource for RateLimitedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_candidates(&self, subject_id: &str) -> Result<Vec<Candidate>, CandidateSourceError> {
        self.limiter.until_ready().await;
        self.inner.fetch_candidates(subject_id).await
    }
}
