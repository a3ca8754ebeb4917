//! Repository port for scan run history.

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::models::ScanRun;

#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Append a run record.
    async fn record(&self, run: &ScanRun) -> Result<(), StoreError>;

    /// Most recent runs for a subject, newest first.
    async fn recent(&self, subject_id: &str, limit: usize) -> Result<Vec<ScanRun>, StoreError>;
}
