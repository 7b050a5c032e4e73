use askdata_adaptor::{AskConfigurations, EngineQuery, QueryResult};
use askdata_persist::{Deployment, Project};

use super::deployment::require_deployment;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Everything an ask-pipeline call needs from the current deployment
pub struct AskContext {
    pub project: Project,
    pub deployment: Deployment,
    pub language: String,
}

impl AskContext {
    /// Fails with `NoDeployment` when nothing has been deployed yet.
    ///
    /// Language: the caller's, then the project's, then the configured default.
    pub async fn load(state: &AppState, requested_language: Option<&str>) -> ApiResult<Self> {
        let (project, deployment) = require_deployment(state.store.as_ref()).await?;

        let language = requested_language
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .or_else(|| project.language.clone())
            .unwrap_or_else(|| state.config.ask.default_language.clone());

        Ok(Self {
            project,
            deployment,
            language,
        })
    }

    pub fn configurations(&self) -> AskConfigurations {
        AskConfigurations {
            language: self.language.clone(),
        }
    }

    pub fn engine_query<'a>(&'a self, sql: &'a str) -> EngineQuery<'a> {
        EngineQuery {
            sql,
            manifest: &self.deployment.manifest,
            data_source: &self.project.data_source,
        }
    }

    /// Run `sql` on the engine; any engine failure is an invalid-SQL error
    /// carrying the engine's message verbatim
    pub async fn preview(&self, state: &AppState, sql: &str, limit: u32) -> ApiResult<QueryResult> {
        state
            .engine
            .preview(self.engine_query(sql), limit)
            .await
            .map_err(|e| {
                tracing::warn!("SQL preview failed: {}", e);
                ApiError::InvalidSql {
                    message: e.message(),
                    sql: sql.to_string(),
                }
            })
    }
}

/// Caller's thread id, or a fresh one for a new conversation
pub fn thread_id_or_new(thread_id: Option<&str>) -> String {
    match thread_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}
