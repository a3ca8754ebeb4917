//! SQLite implementation of the RunRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::StoreError;
use crate::domain::models::{RunStatus, ScanRun};
use crate::domain::ports::RunRepository;

use super::{parse_datetime, parse_json_or_default, parse_uuid};

#[derive(Clone)]
pub struct SqliteRunRepository {
    pool: SqlitePool,
}

impl SqliteRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRepository for SqliteRunRepository {
    async fn record(&self, run: &ScanRun) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO scan_runs (id, subject_id, started_at, finished_at, status, joined_ids, created_ids, left_ids, role_changed_ids, suppressed, error)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(run.id.to_string())
        .bind(&run.subject_id)
        .bind(run.started_at.to_rfc3339())
        .bind(run.finished_at.to_rfc3339())
        .bind(run.status.as_str())
        .bind(serde_json::to_string(&run.joined_ids)?)
        .bind(serde_json::to_string(&run.created_ids)?)
        .bind(serde_json::to_string(&run.left_ids)?)
        .bind(serde_json::to_string(&run.role_changed_ids)?)
        .bind(i64::from(run.suppressed))
        .bind(&run.error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, subject_id: &str, limit: usize) -> Result<Vec<ScanRun>, StoreError> {
        let rows: Vec<ScanRunRow> = sqlx::query_as(
            "SELECT id, subject_id, started_at, finished_at, status, joined_ids, created_ids, left_ids, role_changed_ids, suppressed, error FROM scan_runs WHERE subject_id = ? ORDER BY started_at DESC, rowid DESC LIMIT ?",
        )
        .bind(subject_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ScanRun::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ScanRunRow {
    id: String,
    subject_id: String,
    started_at: String,
    finished_at: String,
    status: String,
    joined_ids: Option<String>,
    created_ids: Option<String>,
    left_ids: Option<String>,
    role_changed_ids: Option<String>,
    suppressed: i64,
    error: Option<String>,
}

impl TryFrom<ScanRunRow> for ScanRun {
    type Error = StoreError;

    fn try_from(row: ScanRunRow) -> Result<Self, Self::Error> {
        let status = RunStatus::from_str(&row.status)
            .ok_or_else(|| StoreError::Serialization(format!("Invalid status: {}", row.status)))?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            subject_id: row.subject_id,
            started_at: parse_datetime(&row.started_at)?,
            finished_at: parse_datetime(&row.finished_at)?,
            status,
            joined_ids: parse_json_or_default(row.joined_ids)?,
            created_ids: parse_json_or_default(row.created_ids)?,
            left_ids: parse_json_or_default(row.left_ids)?,
            role_changed_ids: parse_json_or_default(row.role_changed_ids)?,
            suppressed: u32::try_from(row.suppressed).unwrap_or(0),
            error: row.error,
        })
    }
}
