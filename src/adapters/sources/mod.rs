//! Candidate source adapters.
//!
//! Detectors themselves live outside this crate; these adapters read their
//! output and combine several of them behind the `CandidateSource` port.

pub mod composite;
pub mod http;
pub mod json_file;
pub mod rate_limited;

pub use composite::CompositeCandidateSource;
pub use http::HttpCandidateSource;
pub use json_file::JsonFileSource;
pub use rate_limited::{shared_rate_limiter, RateLimitedSource, SharedRateLimiter};
