//! Port for committed snapshot persistence.

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::models::Snapshot;

/// Holds the last accepted snapshot per subject.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the committed snapshot, or `None` before the first commit.
    async fn load(&self, subject_id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the committed snapshot for `snapshot.subject_id`.
    ///
    /// Must be atomic with respect to concurrent `load`: readers observe
    /// either the old snapshot or the new one, never a mix.
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}
