use askdata_adaptor::{PollError, TextBasedAnswerInput, TextBasedAnswerStatus};
use askdata_persist::ApiType;
use askdata_types::{ErrorBody, GenerateSummaryRequest, GenerateSummaryResponse};
use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::services::context::{thread_id_or_new, AskContext};
use crate::services::history;
use crate::state::AppState;

/// Start a natural-language summary of a query's results
///
/// Returns as soon as the summary task is ready to stream; the text itself
/// is read from `/api/v1/stream_summary`.
#[utoipa::path(
    post,
    path = "/api/v1/generate_summary",
    request_body = GenerateSummaryRequest,
    responses(
        (status = 200, description = "Summary task ready to stream", body = GenerateSummaryResponse),
        (status = 400, description = "Validation error, no deployment or invalid SQL", body = ErrorBody),
        (status = 500, description = "Task failure, polling timeout or upstream failure", body = ErrorBody)
    ),
    tag = "ask"
)]
pub async fn generate_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<GenerateSummaryRequest>,
) -> ApiResult<Json<GenerateSummaryResponse>> {
    let started = Instant::now();
    let result = summarize(&state, &req).await;

    let thread_id = match &result {
        Ok(body) => Some(body.thread_id.clone()),
        Err(_) => req.thread_id.clone(),
    };
    history::record(
        &state,
        ApiType::GenerateSummary,
        &headers,
        thread_id,
        serde_json::to_value(&req).ok(),
        &result,
        started,
    )
    .await;

    result.map(Json)
}

async fn summarize(
    state: &AppState,
    req: &GenerateSummaryRequest,
) -> ApiResult<GenerateSummaryResponse> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question is required".to_string()));
    }
    let sql = req.sql.trim();
    if sql.is_empty() {
        return Err(ApiError::BadRequest("SQL is required".to_string()));
    }

    let ctx = AskContext::load(state, req.language.as_deref()).await?;

    // 1. Sample the result set the summary is written from
    let sample_size = req.sample_size.unwrap_or(state.config.ask.sample_size);
    let preview = ctx.preview(state, sql, sample_size).await?;

    // 2. Start the summary task
    let task = state
        .ai
        .create_text_based_answer(TextBasedAnswerInput {
            query: question.to_string(),
            sql: sql.to_string(),
            sql_data: preview.to_sql_data(),
            thread_id: req.thread_id.clone(),
            configurations: ctx.configurations(),
        })
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to start summary generation: {}", e.message())))?;

    if task.query_id.trim().is_empty() {
        return Err(ApiError::Upstream(
            "Failed to start summary generation task".to_string(),
        ));
    }

    // 3. Wait until it is ready to stream
    let polled = state
        .poller
        .poll(&task.query_id, |id| {
            let ai = Arc::clone(&state.ai);
            async move { ai.get_text_based_answer_result(&id).await }
        })
        .await;

    let result = match polled {
        Ok(result) => result,
        Err(PollError::Timeout { .. }) => {
            return Err(ApiError::PollingTimeout(
                "Timeout waiting for summary generation".to_string(),
            ))
        }
        Err(e) => return Err(ApiError::Upstream(e.to_string())),
    };

    if result.status == TextBasedAnswerStatus::Failed {
        let detail = result.error.and_then(|e| e.message);
        tracing::warn!("Summary task {} failed: {:?}", task.query_id, detail);
        return Err(ApiError::Upstream(match detail {
            Some(detail) => format!("Summary generation failed: {}", detail),
            None => "Summary generation failed".to_string(),
        }));
    }

    Ok(GenerateSummaryResponse {
        explanation_query_id: task.query_id,
        thread_id: thread_id_or_new(req.thread_id.as_deref()),
    })
}
