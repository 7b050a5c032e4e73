use async_trait::async_trait;
use askdata_types::{AnswerDetail, ChartDetail, Thread, ThreadDetail, ThreadResponse};

use crate::error::Result;
use crate::models::{ApiHistoryRecord, ApiType, Deployment, NewApiHistory, NewProject, Project};

/// Trait for database persistence operations
///
/// Writes are last-write-wins; nothing here locks.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// All threads, newest first
    async fn list_threads(&self) -> Result<Vec<Thread>>;

    async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>>;

    /// Thread with its responses ordered by id
    async fn get_thread_detail(&self, thread_id: i64) -> Result<Option<ThreadDetail>>;

    async fn create_thread(&self, summary: &str) -> Result<Thread>;

    /// Fails with `ThreadNotFound` when the thread does not exist
    async fn list_responses(&self, thread_id: i64) -> Result<Vec<ThreadResponse>>;

    async fn get_response(&self, response_id: i64) -> Result<Option<ThreadResponse>>;

    async fn create_response(
        &self,
        thread_id: i64,
        question: &str,
        sql: Option<&str>,
    ) -> Result<ThreadResponse>;

    /// Overwrite the response's SQL (the fix-SQL path)
    async fn update_response_sql(&self, response_id: i64, sql: &str) -> Result<ThreadResponse>;

    async fn update_response_answer(
        &self,
        response_id: i64,
        answer: AnswerDetail,
    ) -> Result<ThreadResponse>;

    async fn update_response_chart(
        &self,
        response_id: i64,
        chart: ChartDetail,
    ) -> Result<ThreadResponse>;

    /// Project with the lowest id
    async fn current_project(&self) -> Result<Option<Project>>;

    async fn create_project(&self, project: NewProject) -> Result<Project>;

    async fn last_deployment(&self, project_id: i64) -> Result<Option<Deployment>>;

    async fn find_deployment(&self, project_id: i64, hash: &str) -> Result<Option<Deployment>>;

    async fn record_deployment(
        &self,
        project_id: i64,
        hash: &str,
        manifest: &serde_json::Value,
    ) -> Result<Deployment>;

    async fn record_api_history(&self, entry: NewApiHistory) -> Result<ApiHistoryRecord>;

    /// Successful calls of `api_type` made within `thread_id`, oldest first
    async fn api_history_for_thread(
        &self,
        thread_id: &str,
        api_type: ApiType,
    ) -> Result<Vec<ApiHistoryRecord>>;

    async fn health_check(&self) -> Result<()>;
}
