use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use super::{json_column, to_json_text};
use crate::error::{PersistError, Result};
use crate::models::{ApiHistoryRecord, ApiType, NewApiHistory};

const COLUMNS: &str = "id, project_id, api_type, thread_id, headers, request_payload, response_payload, status_code, duration_ms, created_at";

#[derive(Clone)]
pub struct ApiHistoryRepository {
    pool: SqlitePool,
}

impl ApiHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, entry: NewApiHistory) -> Result<ApiHistoryRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO api_history (project_id, api_type, thread_id, headers, request_payload, response_payload, status_code, duration_ms, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.project_id)
        .bind(entry.api_type.as_str())
        .bind(&entry.thread_id)
        .bind(to_json_text(entry.headers.as_ref())?)
        .bind(to_json_text(entry.request_payload.as_ref())?)
        .bind(to_json_text(entry.response_payload.as_ref())?)
        .bind(i64::from(entry.status_code))
        .bind(i64::try_from(entry.duration_ms).unwrap_or(i64::MAX))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ApiHistoryRecord {
            id: result.last_insert_rowid(),
            project_id: entry.project_id,
            api_type: entry.api_type,
            thread_id: entry.thread_id,
            headers: entry.headers,
            request_payload: entry.request_payload,
            response_payload: entry.response_payload,
            status_code: entry.status_code,
            duration_ms: entry.duration_ms,
            created_at: now,
        })
    }

    /// Successful (2xx) calls of one type within a thread, oldest first
    pub async fn successful_for_thread(
        &self,
        thread_id: &str,
        api_type: ApiType,
    ) -> Result<Vec<ApiHistoryRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM api_history WHERE thread_id = ? AND api_type = ? AND status_code >= 200 AND status_code < 300 ORDER BY id ASC",
            COLUMNS
        ))
        .bind(thread_id)
        .bind(api_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<ApiHistoryRecord> {
    let api_type: String = row.try_get("api_type")?;
    let status_code: i64 = row.try_get("status_code")?;
    let duration_ms: i64 = row.try_get("duration_ms")?;

    Ok(ApiHistoryRecord {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        api_type: api_type.parse().map_err(PersistError::Internal)?,
        thread_id: row.try_get("thread_id")?,
        headers: json_column(row.try_get("headers")?)?,
        request_payload: json_column(row.try_get("request_payload")?)?,
        response_payload: json_column(row.try_get("response_payload")?)?,
        status_code: u16::try_from(status_code).unwrap_or_default(),
        duration_ms: u64::try_from(duration_ms).unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}
