use askdata_adaptor::{AskHistory, AskInput, AskResult, AskResultType, AskStatus, PollError};
use askdata_persist::ApiType;
use askdata_types::{
    ErrorBody, ErrorCode, GenerateSqlRequest, GenerateSqlResponse, RunSqlRequest, RunSqlResponse,
    DEFAULT_SAMPLE_SIZE,
};
use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::services::context::{thread_id_or_new, AskContext};
use crate::services::history;
use crate::state::AppState;

/// Turn a natural-language question into SQL
///
/// Starts an ask task on the AI service and polls it until it finishes,
/// fails or the polling deadline passes.
#[utoipa::path(
    post,
    path = "/api/v1/generate_sql",
    request_body = GenerateSqlRequest,
    responses(
        (status = 200, description = "SQL generated", body = GenerateSqlResponse),
        (status = 400, description = "Validation error, no deployment, non-SQL question or task failure", body = ErrorBody),
        (status = 500, description = "Polling timeout or upstream failure", body = ErrorBody)
    ),
    tag = "ask"
)]
pub async fn generate_sql(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<GenerateSqlRequest>,
) -> ApiResult<Json<GenerateSqlResponse>> {
    let started = Instant::now();
    let result = ask_for_sql(&state, &req).await;

    let thread_id = match &result {
        Ok(body) => Some(body.thread_id.clone()),
        Err(_) => req.thread_id.clone(),
    };
    history::record(
        &state,
        ApiType::GenerateSql,
        &headers,
        thread_id,
        serde_json::to_value(&req).ok(),
        &result,
        started,
    )
    .await;

    result.map(Json)
}

async fn ask_for_sql(state: &AppState, req: &GenerateSqlRequest) -> ApiResult<GenerateSqlResponse> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question is required".to_string()));
    }

    let ctx = AskContext::load(state, req.language.as_deref()).await?;

    let histories = match req.thread_id.as_deref() {
        Some(thread_id) => load_histories(state, thread_id).await,
        None => Vec::new(),
    };

    // 1. Start the ask task
    let task = state
        .ai
        .ask(AskInput {
            query: question.to_string(),
            mdl_hash: ctx.deployment.hash.clone(),
            histories,
            thread_id: req.thread_id.clone(),
            configurations: ctx.configurations(),
        })
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to start SQL generation: {}", e.message())))?;

    // 2. Poll until terminal
    let result = poll_ask(state, &task.query_id).await?;

    // 3. Interpret the result
    let sql = sql_from_result(&task.query_id, result)?;

    let sql = if req.return_sql_dialect {
        native_dialect(state, &ctx, sql).await
    } else {
        sql
    };

    Ok(GenerateSqlResponse {
        sql,
        thread_id: thread_id_or_new(req.thread_id.as_deref()),
    })
}

async fn poll_ask(state: &AppState, query_id: &str) -> ApiResult<AskResult> {
    let polled = state
        .poller
        .poll(query_id, |id| {
            let ai = Arc::clone(&state.ai);
            async move { ai.get_ask_result(&id).await }
        })
        .await;

    match polled {
        Ok(result) => Ok(result),
        Err(PollError::Timeout { elapsed }) => {
            tracing::warn!("Ask {} still running after {:?}, stopping it", query_id, elapsed);
            if let Err(e) = state.ai.stop_ask(query_id).await {
                tracing::warn!("Failed to stop ask {}: {}", query_id, e);
            }
            Err(ApiError::PollingTimeout(
                "Timeout waiting for SQL generation".to_string(),
            ))
        }
        Err(PollError::MissingTaskId) => Err(ApiError::Upstream(
            "Failed to start SQL generation task".to_string(),
        )),
        Err(PollError::Fetch(e)) => Err(ApiError::Upstream(format!(
            "Failed to fetch SQL generation result: {}",
            e.message()
        ))),
    }
}

/// Map a terminal ask result onto SQL or the matching API error
fn sql_from_result(query_id: &str, result: AskResult) -> ApiResult<String> {
    if matches!(result.status, AskStatus::Failed | AskStatus::Stopped) {
        let (code, message) = match result.error {
            Some(err) => (
                err.code.unwrap_or_else(|| ErrorCode::Others.to_string()),
                err.message
                    .unwrap_or_else(|| "Failed to generate SQL".to_string()),
            ),
            None if result.status == AskStatus::Stopped => (
                ErrorCode::Others.to_string(),
                "SQL generation was stopped".to_string(),
            ),
            None => (
                ErrorCode::Others.to_string(),
                "Failed to generate SQL".to_string(),
            ),
        };
        return Err(ApiError::AiTask {
            code,
            message,
            invalid_sql: result.invalid_sql,
        });
    }

    if result.result_type == Some(AskResultType::General) {
        return Err(ApiError::NonSqlQuery {
            message: "The question cannot be answered with SQL".to_string(),
            explanation_query_id: query_id.to_string(),
        });
    }

    match result.first_sql() {
        Some(sql) => Ok(sql.to_string()),
        None => Err(ApiError::AiTask {
            code: ErrorCode::NoRelevantSql.to_string(),
            message: "No SQL generated".to_string(),
            invalid_sql: result.invalid_sql,
        }),
    }
}

/// Prior successful question/SQL pairs of the thread, oldest first
async fn load_histories(state: &AppState, thread_id: &str) -> Vec<AskHistory> {
    let records = match state
        .store
        .api_history_for_thread(thread_id, ApiType::GenerateSql)
        .await
    {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Failed to load ask history for thread {}: {}", thread_id, e);
            return Vec::new();
        }
    };

    records
        .into_iter()
        .filter_map(|record| {
            let question = record.request_payload?.get("question")?.as_str()?.to_string();
            let sql = record.response_payload?.get("sql")?.as_str()?.to_string();
            (!sql.is_empty()).then_some(AskHistory { question, sql })
        })
        .collect()
}

async fn native_dialect(state: &AppState, ctx: &AskContext, sql: String) -> String {
    match state.engine.native_sql(ctx.engine_query(&sql)).await {
        Ok(native) if !native.trim().is_empty() => native,
        Ok(_) => sql,
        Err(e) => {
            tracing::warn!("Failed to translate SQL to native dialect: {}", e);
            sql
        }
    }
}

/// Execute SQL against the query engine
#[utoipa::path(
    post,
    path = "/api/v1/run_sql",
    request_body = RunSqlRequest,
    responses(
        (status = 200, description = "Query results", body = RunSqlResponse),
        (status = 400, description = "Missing SQL, no deployment or invalid SQL", body = ErrorBody)
    ),
    tag = "ask"
)]
pub async fn run_sql(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RunSqlRequest>,
) -> ApiResult<Json<RunSqlResponse>> {
    let started = Instant::now();
    let result = execute_sql(&state, &req).await;

    let thread_id = match &result {
        Ok(body) => Some(body.thread_id.clone()),
        Err(_) => req.thread_id.clone(),
    };
    history::record(
        &state,
        ApiType::RunSql,
        &headers,
        thread_id,
        serde_json::to_value(&req).ok(),
        &result,
        started,
    )
    .await;

    result.map(Json)
}

async fn execute_sql(state: &AppState, req: &RunSqlRequest) -> ApiResult<RunSqlResponse> {
    let sql = req.sql.trim();
    if sql.is_empty() {
        return Err(ApiError::BadRequest("SQL is required".to_string()));
    }

    let ctx = AskContext::load(state, None).await?;
    let limit = req.limit.unwrap_or(DEFAULT_SAMPLE_SIZE);
    let result = ctx.preview(state, sql, limit).await?;

    Ok(RunSqlResponse {
        records: result.records(),
        total_rows: result.data.len(),
        columns: result.columns,
        thread_id: thread_id_or_new(req.thread_id.as_deref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdata_adaptor::{AiError, AskCandidate};

    fn result(status: AskStatus) -> AskResult {
        AskResult {
            status,
            result_type: Some(AskResultType::TextToSql),
            response: vec![],
            invalid_sql: None,
            error: None,
        }
    }

    #[test]
    fn test_finished_with_sql() {
        let mut r = result(AskStatus::Finished);
        r.response.push(AskCandidate {
            sql: "SELECT 1".to_string(),
            kind: None,
            view_id: None,
        });
        assert_eq!(sql_from_result("q", r).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_finished_without_sql_is_no_relevant_sql() {
        let err = sql_from_result("q", result(AskStatus::Finished)).unwrap_err();
        assert_eq!(err.body().code.as_deref(), Some("NO_RELEVANT_SQL"));
    }

    #[test]
    fn test_failed_keeps_task_code_and_invalid_sql() {
        let mut r = result(AskStatus::Failed);
        r.error = Some(AiError {
            code: Some("NO_RELEVANT_DATA".to_string()),
            message: Some("No relevant data".to_string()),
        });
        r.invalid_sql = Some("SELECT bogus".to_string());

        let body = sql_from_result("q", r).unwrap_err().body();
        assert_eq!(body.code.as_deref(), Some("NO_RELEVANT_DATA"));
        assert_eq!(body.error, "No relevant data");
        assert_eq!(body.invalid_sql.as_deref(), Some("SELECT bogus"));
    }

    #[test]
    fn test_general_question_points_at_explanation() {
        let mut r = result(AskStatus::Finished);
        r.result_type = Some(AskResultType::General);

        let body = sql_from_result("ask-7", r).unwrap_err().body();
        assert_eq!(body.code.as_deref(), Some("NON_SQL_QUERY"));
        assert_eq!(body.explanation_query_id.as_deref(), Some("ask-7"));
    }
}
