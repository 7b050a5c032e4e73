use askdata_adaptor::{AdaptorError, ByteStream, DONE_FRAME};
use askdata_persist::ApiType;
use askdata_types::{ErrorBody, StreamQuery};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::services::history;
use crate::state::AppState;

/// Relay the token stream of a summary task
#[utoipa::path(
    get,
    path = "/api/v1/stream_summary",
    params(
        ("queryId" = String, Query, description = "Summary task id from generate_summary")
    ),
    responses(
        (status = 200, description = "Relayed SSE stream", content_type = "text/event-stream"),
        (status = 400, description = "queryId is required", body = ErrorBody),
        (status = 500, description = "Upstream stream could not be opened", body = ErrorBody)
    ),
    tag = "stream"
)]
pub async fn stream_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    let query_id = require_query_id(&query)?;
    let started = Instant::now();

    let opened = state
        .ai
        .stream_text_based_answer(&query_id)
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to open summary stream: {}", e.message())));

    relay_opened(&state, ApiType::StreamSummary, &headers, &query_id, opened, started).await
}

/// Relay the explanation stream of a question that is not answerable with SQL
#[utoipa::path(
    get,
    path = "/api/v1/stream_explanation",
    params(
        ("queryId" = String, Query, description = "Ask task id from a NON_SQL_QUERY error")
    ),
    responses(
        (status = 200, description = "Relayed SSE stream", content_type = "text/event-stream"),
        (status = 400, description = "queryId is required", body = ErrorBody),
        (status = 500, description = "Upstream stream could not be opened", body = ErrorBody)
    ),
    tag = "stream"
)]
pub async fn stream_explanation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    let query_id = require_query_id(&query)?;
    let started = Instant::now();

    let opened = state
        .ai
        .stream_ask_explanation(&query_id)
        .await
        .map_err(|e| {
            ApiError::Upstream(format!("Failed to open explanation stream: {}", e.message()))
        });

    relay_opened(&state, ApiType::StreamExplanation, &headers, &query_id, opened, started).await
}

fn require_query_id(query: &StreamQuery) -> ApiResult<String> {
    match query.query_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ApiError::BadRequest("queryId is required".to_string())),
    }
}

async fn relay_opened(
    state: &AppState,
    api_type: ApiType,
    headers: &HeaderMap,
    query_id: &str,
    opened: ApiResult<ByteStream>,
    started: Instant,
) -> ApiResult<Response> {
    history::record_stream(
        state,
        api_type,
        headers,
        query_id,
        opened.as_ref().map(|_| ()),
        started,
    )
    .await;

    let upstream = opened?;
    tracing::info!("Relaying {} stream for {}", api_type, query_id);
    Ok(sse_relay(upstream))
}

/// Forward an upstream SSE body to the client.
///
/// Chunks pass through untouched and one done frame is appended when the
/// upstream ends cleanly. An upstream error aborts the response without a
/// done frame. Dropping the response body drops the upstream connection.
pub fn sse_relay(upstream: ByteStream) -> Response {
    let body = async_stream::stream! {
        let mut upstream = upstream;

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => yield Ok::<Bytes, AdaptorError>(bytes),
                Err(e) => {
                    tracing::warn!("Upstream stream failed: {}", e);
                    yield Err(e);
                    return;
                }
            }
        }

        yield Ok(Bytes::from_static(DONE_FRAME));
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
