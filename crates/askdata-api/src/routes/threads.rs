use askdata_types::{
    AnswerDetail, CreateResponseRequest, CreateThreadRequest, ErrorBody, ResponseEnvelope,
    ResponsesEnvelope, ThreadDetailEnvelope, ThreadEnvelope, ThreadsEnvelope, UpdateAnswerRequest, UpdateSqlRequest,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

fn parse_thread_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid thread ID".to_string()))
}

fn parse_response_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid response ID".to_string()))
}

/// List all threads
#[utoipa::path(
    get,
    path = "/api/v1/threads",
    responses(
        (status = 200, description = "List of threads", body = ThreadsEnvelope)
    ),
    tag = "threads"
)]
pub async fn list_threads(State(state): State<Arc<AppState>>) -> ApiResult<Json<ThreadsEnvelope>> {
    let threads = state.store.list_threads().await?;
    Ok(Json(ThreadsEnvelope { threads }))
}

/// Create a new thread
#[utoipa::path(
    post,
    path = "/api/v1/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 201, description = "Thread created", body = ThreadEnvelope),
        (status = 400, description = "Summary is required", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<ThreadEnvelope>)> {
    let summary = req.summary.trim();
    if summary.is_empty() {
        return Err(ApiError::BadRequest("Summary is required".to_string()));
    }

    let thread = state.store.create_thread(summary).await?;
    tracing::info!("Created thread {}", thread.id);

    Ok((StatusCode::CREATED, Json(ThreadEnvelope { thread })))
}

/// Get a thread with its responses
#[utoipa::path(
    get,
    path = "/api/v1/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread details", body = ThreadDetailEnvelope),
        (status = 400, description = "Invalid thread ID", body = ErrorBody),
        (status = 404, description = "Thread not found", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadDetailEnvelope>> {
    let thread_id = parse_thread_id(&thread_id)?;

    let thread = state
        .store
        .get_thread_detail(thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Thread not found".to_string()))?;

    Ok(Json(ThreadDetailEnvelope { thread }))
}

/// List the responses of a thread
#[utoipa::path(
    get,
    path = "/api/v1/threads/{thread_id}/responses",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Responses ordered by id", body = ResponsesEnvelope),
        (status = 400, description = "Invalid thread ID", body = ErrorBody),
        (status = 404, description = "Thread not found", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn list_responses(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ResponsesEnvelope>> {
    let thread_id = parse_thread_id(&thread_id)?;
    let responses = state.store.list_responses(thread_id).await?;
    Ok(Json(ResponsesEnvelope { responses }))
}

/// Append a response (question) to a thread
#[utoipa::path(
    post,
    path = "/api/v1/threads/{thread_id}/responses",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = CreateResponseRequest,
    responses(
        (status = 201, description = "Response created", body = ResponseEnvelope),
        (status = 400, description = "Invalid thread ID or missing question", body = ErrorBody),
        (status = 404, description = "Thread not found", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn create_response(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    ApiJson(req): ApiJson<CreateResponseRequest>,
) -> ApiResult<(StatusCode, Json<ResponseEnvelope>)> {
    let thread_id = parse_thread_id(&thread_id)?;
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question is required".to_string()));
    }

    let sql = req.sql.as_deref().filter(|s| !s.trim().is_empty());
    let response = state
        .store
        .create_response(thread_id, question, sql)
        .await?;

    Ok((StatusCode::CREATED, Json(ResponseEnvelope { response })))
}

/// Overwrite the SQL of a response
#[utoipa::path(
    post,
    path = "/api/v1/threads/{thread_id}/responses/{response_id}/sql",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("response_id" = String, Path, description = "Response ID")
    ),
    request_body = UpdateSqlRequest,
    responses(
        (status = 200, description = "Response updated", body = ResponseEnvelope),
        (status = 400, description = "Invalid ID or missing SQL", body = ErrorBody),
        (status = 404, description = "Response not found", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn update_response_sql(
    State(state): State<Arc<AppState>>,
    Path((thread_id, response_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<UpdateSqlRequest>,
) -> ApiResult<Json<ResponseEnvelope>> {
    let thread_id = parse_thread_id(&thread_id)?;
    let response_id = parse_response_id(&response_id)?;
    let sql = req.sql.trim();
    if sql.is_empty() {
        return Err(ApiError::BadRequest("SQL is required".to_string()));
    }

    ensure_response_in_thread(&state, thread_id, response_id).await?;
    let response = state.store.update_response_sql(response_id, sql).await?;

    Ok(Json(ResponseEnvelope { response }))
}

/// Store the final answer of a response
#[utoipa::path(
    post,
    path = "/api/v1/threads/{thread_id}/responses/{response_id}/answer",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("response_id" = String, Path, description = "Response ID")
    ),
    request_body = UpdateAnswerRequest,
    responses(
        (status = 200, description = "Response updated", body = ResponseEnvelope),
        (status = 400, description = "Invalid ID", body = ErrorBody),
        (status = 404, description = "Response not found", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn update_response_answer(
    State(state): State<Arc<AppState>>,
    Path((thread_id, response_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<UpdateAnswerRequest>,
) -> ApiResult<Json<ResponseEnvelope>> {
    let thread_id = parse_thread_id(&thread_id)?;
    let response_id = parse_response_id(&response_id)?;

    ensure_response_in_thread(&state, thread_id, response_id).await?;
    let response = state
        .store
        .update_response_answer(
            response_id,
            AnswerDetail {
                status: req.status.unwrap_or_default(),
                content: req.content,
            },
        )
        .await?;

    Ok(Json(ResponseEnvelope { response }))
}

async fn ensure_response_in_thread(
    state: &AppState,
    thread_id: i64,
    response_id: i64,
) -> ApiResult<()> {
    match state.store.get_response(response_id).await? {
        Some(response) if response.thread_id == thread_id => Ok(()),
        _ => Err(ApiError::NotFound("Response not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        assert_eq!(parse_thread_id("12").unwrap(), 12);
        assert_eq!(
            parse_thread_id("abc").unwrap_err().body().error,
            "Invalid thread ID"
        );
        assert_eq!(
            parse_response_id("1.5").unwrap_err().body().error,
            "Invalid response ID"
        );
    }
}
