use async_trait::async_trait;
use askdata_types::{AnswerDetail, ChartDetail, Thread, ThreadDetail, ThreadResponse};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::repositories::{ApiHistoryRepository, ProjectRepository, ThreadRepository};
use crate::error::{PersistError, Result};
use crate::models::{ApiHistoryRecord, ApiType, Deployment, NewApiHistory, NewProject, Project};
use crate::store::ThreadStore;

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    threads: ThreadRepository,
    projects: ProjectRepository,
    api_history: ApiHistoryRepository,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url`
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        tracing::info!("SQLite connected: {}", url);
        Ok(Self::from_pool(pool))
    }

    /// Private in-memory database, mostly for tests.
    ///
    /// Every connection to `sqlite::memory:` is a separate database, so the
    /// pool is pinned to one connection that never expires.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            threads: ThreadRepository::new(pool.clone()),
            projects: ProjectRepository::new(pool.clone()),
            api_history: ApiHistoryRepository::new(pool.clone()),
            pool,
        }
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::StoreBuilder {
        crate::builder::StoreBuilder::new()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ThreadStore for SqliteStore {
    async fn list_threads(&self) -> Result<Vec<Thread>> {
        self.threads.list_threads().await
    }

    async fn get_thread(&self, thread_id: i64) -> Result<Option<Thread>> {
        self.threads.get_thread(thread_id).await
    }

    async fn get_thread_detail(&self, thread_id: i64) -> Result<Option<ThreadDetail>> {
        let Some(thread) = self.threads.get_thread(thread_id).await? else {
            return Ok(None);
        };
        let responses = self.threads.list_responses(thread_id).await?;
        Ok(Some(ThreadDetail { thread, responses }))
    }

    async fn create_thread(&self, summary: &str) -> Result<Thread> {
        self.threads.create_thread(summary).await
    }

    async fn list_responses(&self, thread_id: i64) -> Result<Vec<ThreadResponse>> {
        if self.threads.get_thread(thread_id).await?.is_none() {
            return Err(PersistError::ThreadNotFound(thread_id));
        }
        self.threads.list_responses(thread_id).await
    }

    async fn get_response(&self, response_id: i64) -> Result<Option<ThreadResponse>> {
        self.threads.get_response(response_id).await
    }

    async fn create_response(
        &self,
        thread_id: i64,
        question: &str,
        sql: Option<&str>,
    ) -> Result<ThreadResponse> {
        self.threads.create_response(thread_id, question, sql).await
    }

    async fn update_response_sql(&self, response_id: i64, sql: &str) -> Result<ThreadResponse> {
        self.threads.update_sql(response_id, sql).await
    }

    async fn update_response_answer(
        &self,
        response_id: i64,
        answer: AnswerDetail,
    ) -> Result<ThreadResponse> {
        self.threads.update_answer(response_id, &answer).await
    }

    async fn update_response_chart(
        &self,
        response_id: i64,
        chart: ChartDetail,
    ) -> Result<ThreadResponse> {
        self.threads.update_chart(response_id, &chart).await
    }

    async fn current_project(&self) -> Result<Option<Project>> {
        self.projects.current_project().await
    }

    async fn create_project(&self, project: NewProject) -> Result<Project> {
        self.projects.create_project(project).await
    }

    async fn last_deployment(&self, project_id: i64) -> Result<Option<Deployment>> {
        self.projects.last_deployment(project_id).await
    }

    async fn find_deployment(&self, project_id: i64, hash: &str) -> Result<Option<Deployment>> {
        self.projects.find_deployment(project_id, hash).await
    }

    async fn record_deployment(
        &self,
        project_id: i64,
        hash: &str,
        manifest: &serde_json::Value,
    ) -> Result<Deployment> {
        self.projects.record_deployment(project_id, hash, manifest).await
    }

    async fn record_api_history(&self, entry: NewApiHistory) -> Result<ApiHistoryRecord> {
        self.api_history.record(entry).await
    }

    async fn api_history_for_thread(
        &self,
        thread_id: &str,
        api_type: ApiType,
    ) -> Result<Vec<ApiHistoryRecord>> {
        self.api_history.successful_for_thread(thread_id, api_type).await
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
