use askdata_adaptor::{ChartInput, ChartStatus, PollError};
use askdata_persist::ApiType;
use askdata_types::{ChartDetail, ErrorBody, GenerateChartRequest, GenerateChartResponse};
use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::services::context::{thread_id_or_new, AskContext};
use crate::services::history;
use crate::state::AppState;

/// Generate a Vega-Lite chart for a query's results
#[utoipa::path(
    post,
    path = "/api/v1/generate_vega_chart",
    request_body = GenerateChartRequest,
    responses(
        (status = 200, description = "Chart specification", body = GenerateChartResponse),
        (status = 400, description = "Validation error, no deployment or invalid SQL", body = ErrorBody),
        (status = 500, description = "Task failure, polling timeout or upstream failure", body = ErrorBody)
    ),
    tag = "ask"
)]
pub async fn generate_vega_chart(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<GenerateChartRequest>,
) -> ApiResult<Json<GenerateChartResponse>> {
    let started = Instant::now();
    let result = chart(&state, &req).await;

    if let Some(response_id) = req.response_id {
        persist_chart(&state, response_id, &result).await;
    }

    let thread_id = match &result {
        Ok(body) => Some(body.thread_id.clone()),
        Err(_) => req.thread_id.clone(),
    };
    history::record(
        &state,
        ApiType::GenerateVegaChart,
        &headers,
        thread_id,
        serde_json::to_value(&req).ok(),
        &result,
        started,
    )
    .await;

    result.map(Json)
}

async fn chart(state: &AppState, req: &GenerateChartRequest) -> ApiResult<GenerateChartResponse> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question is required".to_string()));
    }
    let sql = req.sql.trim();
    if sql.is_empty() {
        return Err(ApiError::BadRequest("SQL is required".to_string()));
    }

    let ctx = AskContext::load(state, req.language.as_deref()).await?;
    let sample_size = req.sample_size.unwrap_or(state.config.ask.sample_size);
    let preview = ctx.preview(state, sql, sample_size).await?;

    let task = state
        .ai
        .generate_chart(ChartInput {
            query: question.to_string(),
            sql: sql.to_string(),
            data: preview.to_sql_data(),
            thread_id: req.thread_id.clone(),
            configurations: ctx.configurations(),
        })
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to start chart generation: {}", e.message())))?;

    let polled = state
        .poller
        .poll(&task.query_id, |id| {
            let ai = Arc::clone(&state.ai);
            async move { ai.get_chart_result(&id).await }
        })
        .await;

    let result = match polled {
        Ok(result) => result,
        Err(PollError::Timeout { .. }) => {
            return Err(ApiError::PollingTimeout(
                "Timeout waiting for chart generation".to_string(),
            ))
        }
        Err(PollError::MissingTaskId) => {
            return Err(ApiError::Upstream(
                "Failed to start chart generation task".to_string(),
            ))
        }
        Err(e) => return Err(ApiError::Upstream(e.to_string())),
    };

    if result.status != ChartStatus::Finished {
        let detail = result
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Chart generation failed".to_string());
        return Err(ApiError::Upstream(detail));
    }

    let vega_spec = result
        .response
        .map(|r| r.chart_schema)
        .filter(|schema| !schema.is_null())
        .ok_or_else(|| ApiError::Upstream("Chart generation returned no chart".to_string()))?;

    Ok(GenerateChartResponse {
        vega_spec,
        thread_id: thread_id_or_new(req.thread_id.as_deref()),
    })
}

/// Store the chart (or why it failed) on the response; best-effort
async fn persist_chart(state: &AppState, response_id: i64, result: &ApiResult<GenerateChartResponse>) {
    let detail = match result {
        Ok(body) => ChartDetail {
            chart_schema: Some(body.vega_spec.clone()),
            error: None,
        },
        Err(e) => ChartDetail {
            chart_schema: None,
            error: Some(e.to_string()),
        },
    };

    if let Err(e) = state.store.update_response_chart(response_id, detail).await {
        tracing::warn!("Failed to persist chart for response {}: {}", response_id, e);
    }
}
