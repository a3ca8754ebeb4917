//! Candidate source that pulls detector output over HTTP.
//!
//! `GET {endpoint}/{subject_id}` must return a JSON array of candidates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::domain::errors::CandidateSourceError;
use crate::domain::models::Candidate;
use crate::domain::ports::CandidateSource;

#[derive(Debug, Clone)]
pub struct HttpCandidateSource {
    name: String,
    endpoint: String,
    timeout: Duration,
    http: Client,
}

impl HttpCandidateSource {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CandidateSourceError> {
        let name = name.into();
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("memberscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CandidateSourceError::failed(&name, format!("client setup failed: {e}")))?;
        Ok(Self {
            name,
            endpoint: endpoint.into(),
            timeout,
            http,
        })
    }

    fn url_for(&self, subject_id: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), subject_id)
    }
}

#[async_trait]
impl CandidateSource for HttpCandidateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_candidates(&self, subject_id: &str) -> Result<Vec<Candidate>, CandidateSourceError> {
        let url = self.url_for(subject_id);
        debug!(source = %self.name, %url, "Fetching candidates");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                CandidateSourceError::Timeout {
                    source_name: self.name.clone(),
                    after: self.timeout,
                }
            } else {
                CandidateSourceError::failed(&self.name, format!("request failed: {e}"))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CandidateSourceError::failed(
                &self.name,
                format!("returned {status}: {body}"),
            ));
        }

        resp.json::<Vec<Candidate>>()
            .await
            .map_err(|e| CandidateSourceError::failed(&self.name, format!("parse failed: {e}")))
    }
}
