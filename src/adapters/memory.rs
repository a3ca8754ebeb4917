//! In-process implementations of the persistence ports.
//!
//! Used by the one-shot CLI when no database is wanted, and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::StoreError;
use crate::domain::models::{ScanRun, Snapshot};
use crate::domain::ports::{RunRepository, SnapshotStore};

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with snapshots.
    pub fn with_snapshots(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            snapshots: RwLock::new(
                snapshots
                    .into_iter()
                    .map(|s| (s.subject_id.clone(), s))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, subject_id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshots.read().await.get(subject_id).cloned())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.subject_id.clone(), snapshot.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRunRepository {
    runs: RwLock<Vec<ScanRun>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn record(&self, run: &ScanRun) -> Result<(), StoreError> {
        self.runs.write().await.push(run.clone());
        Ok(())
    }

    async fn recent(&self, subject_id: &str, limit: usize) -> Result<Vec<ScanRun>, StoreError> {
        Ok(self
            .runs
            .read()
            .await
            .iter()
            .rev()
            .filter(|run| run.subject_id == subject_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
