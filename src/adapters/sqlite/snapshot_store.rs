//! SQLite implementation of the SnapshotStore.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::StoreError;
use crate::domain::models::{CanonicalCommunity, DetectionMethod, Role, Snapshot};
use crate::domain::ports::SnapshotStore;

use super::{parse_datetime, parse_json_or_default};

#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Subject ids that have a committed snapshot.
    pub async fn subjects(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT subject_id FROM snapshots ORDER BY subject_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self, subject_id: &str) -> Result<Option<Snapshot>, StoreError> {
        let header: Option<(String, String)> =
            sqlx::query_as("SELECT as_of, reported FROM snapshots WHERE subject_id = ?")
                .bind(subject_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Read {
                    subject_id: subject_id.to_string(),
                    message: e.to_string(),
                })?;

        let Some((as_of, reported)) = header else {
            return Ok(None);
        };

        let rows: Vec<CommunityRow> = sqlx::query_as(
            "SELECT community_id, display_name, role, confidence, source_count, first_seen_at, last_seen_at, methods, source_ids FROM snapshot_communities WHERE subject_id = ? ORDER BY community_id",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Read {
            subject_id: subject_id.to_string(),
            message: e.to_string(),
        })?;

        let communities = rows
            .into_iter()
            .map(CanonicalCommunity::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut snapshot = Snapshot::from_communities(subject_id, parse_datetime(&as_of)?, communities);
        snapshot.reported = serde_json::from_str::<BTreeSet<String>>(&reported)?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let write_err = |e: sqlx::Error| StoreError::Write {
            subject_id: snapshot.subject_id.clone(),
            message: e.to_string(),
        };

        let reported_json = serde_json::to_string(&snapshot.reported)?;
        let mut tx = self.pool.begin().await.map_err(write_err)?;

        sqlx::query(
            r#"INSERT INTO snapshots (subject_id, as_of, reported, updated_at)
               VALUES (?, ?, ?, datetime('now'))
               ON CONFLICT(subject_id) DO UPDATE SET
                   as_of = excluded.as_of,
                   reported = excluded.reported,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&snapshot.subject_id)
        .bind(snapshot.as_of.to_rfc3339())
        .bind(&reported_json)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        sqlx::query("DELETE FROM snapshot_communities WHERE subject_id = ?")
            .bind(&snapshot.subject_id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        for community in snapshot.communities.values() {
            let methods: Vec<&str> = community.methods.iter().map(DetectionMethod::as_str).collect();
            sqlx::query(
                r#"INSERT INTO snapshot_communities
                   (subject_id, community_id, display_name, role, confidence, source_count, first_seen_at, last_seen_at, methods, source_ids)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&snapshot.subject_id)
            .bind(&community.id)
            .bind(&community.display_name)
            .bind(community.role.as_str())
            .bind(community.confidence)
            .bind(i64::from(community.source_count))
            .bind(community.first_seen_at.to_rfc3339())
            .bind(community.last_seen_at.to_rfc3339())
            .bind(serde_json::to_string(&methods)?)
            .bind(serde_json::to_string(&community.source_ids)?)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(write_err)?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CommunityRow {
    community_id: String,
    display_name: String,
    role: String,
    confidence: f64,
    source_count: i64,
    first_seen_at: String,
    last_seen_at: String,
    methods: Option<String>,
    source_ids: Option<String>,
}

impl TryFrom<CommunityRow> for CanonicalCommunity {
    type Error = StoreError;

    fn try_from(row: CommunityRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .ok_or_else(|| StoreError::Serialization(format!("Invalid role: {}", row.role)))?;
        let methods: Vec<String> = parse_json_or_default(row.methods)?;

        Ok(Self {
            id: row.community_id,
            display_name: row.display_name,
            role,
            confidence: row.confidence,
            source_count: u32::try_from(row.source_count).unwrap_or(0),
            first_seen_at: parse_datetime(&row.first_seen_at)?,
            last_seen_at: parse_datetime(&row.last_seen_at)?,
            methods: methods.into_iter().map(DetectionMethod::from).collect(),
            source_ids: parse_json_or_default(row.source_ids)?,
        })
    }
}
