//! Candidate source backed by a directory of JSON files.
//!
//! Each subject maps to `<dir>/<subject_id>.json` containing an array of
//! candidates, the format detectors write when run out of process.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::CandidateSourceError;
use crate::domain::models::Candidate;
use crate::domain::ports::CandidateSource;

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "json_file".to_string(),
            dir: dir.into(),
        }
    }

    pub fn path_for(&self, subject_id: &str) -> PathBuf {
        self.dir.join(format!("{subject_id}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CandidateSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_candidates(&self, subject_id: &str) -> Result<Vec<Candidate>, CandidateSourceError> {
        let path = self.path_for(subject_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No candidate file");
                return Ok(vec![]);
            }
            Err(e) => {
                return Err(CandidateSourceError::failed(
                    &self.name,
                    format!("{}: {e}", path.display()),
                ))
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            CandidateSourceError::failed(&self.name, format!("{}: {e}", path.display()))
        })
    }
}
