use askdata_types::{AnswerDetail, ChartDetail, Thread, ThreadResponse};
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use super::{json_column, to_json_text};
use crate::error::{PersistError, Result};

const RESPONSE_COLUMNS: &str =
    "id, thread_id, question, sql, answer_detail, chart_detail, created_at, updated_at";

#[derive(Clone)]
pub struct ThreadRepository {
    pool: SqlitePool,
}

impl ThreadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_thread(&self, summary: &str) -> Result<Thread> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO thread (summary, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(summary)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(Thread {
            id: result.last_insert_rowid(),
            summary: summary.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>> {
        let row = sqlx::query("SELECT id, summary, created_at, updated_at FROM thread WHERE id = ?")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| thread_from_row(&r)).transpose()
    }

    /// Newest threads first
    pub async fn list_threads(&self) -> Result<Vec<Thread>> {
        let rows = sqlx::query(
            "SELECT id, summary, created_at, updated_at FROM thread ORDER BY updated_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(thread_from_row).collect()
    }

    pub async fn list_responses(&self, thread_id: i64) -> Result<Vec<ThreadResponse>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM thread_response WHERE thread_id = ? ORDER BY id ASC",
            RESPONSE_COLUMNS
        ))
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(response_from_row).collect()
    }

    pub async fn get_response(&self, response_id: i64) -> Result<Option<ThreadResponse>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM thread_response WHERE id = ?",
            RESPONSE_COLUMNS
        ))
        .bind(response_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| response_from_row(&r)).transpose()
    }

    pub async fn create_response(
        &self,
        thread_id: i64,
        question: &str,
        sql: Option<&str>,
    ) -> Result<ThreadResponse> {
        if self.get_thread(thread_id).await?.is_none() {
            return Err(PersistError::ThreadNotFound(thread_id));
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO thread_response (thread_id, question, sql, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(thread_id)
        .bind(question)
        .bind(sql)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.touch_thread(thread_id).await?;

        Ok(ThreadResponse {
            id: result.last_insert_rowid(),
            thread_id,
            question: question.to_string(),
            sql: sql.map(str::to_string),
            answer_detail: None,
            chart_detail: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn update_sql(&self, response_id: i64, sql: &str) -> Result<ThreadResponse> {
        let result = sqlx::query("UPDATE thread_response SET sql = ?, updated_at = ? WHERE id = ?")
            .bind(sql)
            .bind(Utc::now())
            .bind(response_id)
            .execute(&self.pool)
            .await?;

        self.reload(response_id, result.rows_affected()).await
    }

    pub async fn update_answer(&self, response_id: i64, answer: &AnswerDetail) -> Result<ThreadResponse> {
        let result =
            sqlx::query("UPDATE thread_response SET answer_detail = ?, updated_at = ? WHERE id = ?")
                .bind(to_json_text(Some(answer))?)
                .bind(Utc::now())
                .bind(response_id)
                .execute(&self.pool)
                .await?;

        self.reload(response_id, result.rows_affected()).await
    }

    pub async fn update_chart(&self, response_id: i64, chart: &ChartDetail) -> Result<ThreadResponse> {
        let result =
            sqlx::query("UPDATE thread_response SET chart_detail = ?, updated_at = ? WHERE id = ?")
                .bind(to_json_text(Some(chart))?)
                .bind(Utc::now())
                .bind(response_id)
                .execute(&self.pool)
                .await?;

        self.reload(response_id, result.rows_affected()).await
    }

    async fn reload(&self, response_id: i64, rows_affected: u64) -> Result<ThreadResponse> {
        if rows_affected == 0 {
            return Err(PersistError::ResponseNotFound(response_id));
        }
        let response = self
            .get_response(response_id)
            .await?
            .ok_or(PersistError::ResponseNotFound(response_id))?;
        self.touch_thread(response.thread_id).await?;
        Ok(response)
    }

    async fn touch_thread(&self, thread_id: i64) -> Result<()> {
        sqlx::query("UPDATE thread SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn thread_from_row(row: &SqliteRow) -> Result<Thread> {
    Ok(Thread {
        id: row.try_get("id")?,
        summary: row.try_get("summary")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn response_from_row(row: &SqliteRow) -> Result<ThreadResponse> {
    Ok(ThreadResponse {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        question: row.try_get("question")?,
        sql: row.try_get("sql")?,
        answer_detail: json_column(row.try_get("answer_detail")?)?,
        chart_detail: json_column(row.try_get("chart_detail")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
