use askdata_persist::{ApiType, NewApiHistory};
use axum::http::{header, HeaderMap, HeaderName};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Record one API call in the history table.
///
/// Best-effort: failures are logged and never reach the caller.
pub async fn record<T: Serialize>(
    state: &AppState,
    api_type: ApiType,
    headers: &HeaderMap,
    thread_id: Option<String>,
    request_payload: Option<serde_json::Value>,
    result: &ApiResult<T>,
    started: Instant,
) {
    let (status_code, response_payload) = match result {
        Ok(body) => (200, serde_json::to_value(body).ok()),
        Err(e) => (e.status().as_u16(), serde_json::to_value(e.body()).ok()),
    };

    write(
        state,
        api_type,
        headers,
        thread_id,
        request_payload,
        response_payload,
        status_code,
        started,
    )
    .await;
}

/// Record the opening of a relayed stream; the streamed body itself is not kept
pub async fn record_stream(
    state: &AppState,
    api_type: ApiType,
    headers: &HeaderMap,
    query_id: &str,
    outcome: Result<(), &ApiError>,
    started: Instant,
) {
    let (status_code, response_payload) = match outcome {
        Ok(()) => (200, None),
        Err(e) => (e.status().as_u16(), serde_json::to_value(e.body()).ok()),
    };

    write(
        state,
        api_type,
        headers,
        None,
        Some(serde_json::json!({ "queryId": query_id })),
        response_payload,
        status_code,
        started,
    )
    .await;
}

async fn write(
    state: &AppState,
    api_type: ApiType,
    headers: &HeaderMap,
    thread_id: Option<String>,
    request_payload: Option<serde_json::Value>,
    response_payload: Option<serde_json::Value>,
    status_code: u16,
    started: Instant,
) {
    let project_id = match state.store.current_project().await {
        Ok(project) => project.map(|p| p.id),
        Err(e) => {
            tracing::warn!("Failed to resolve project for API history: {}", e);
            None
        }
    };

    let entry = NewApiHistory {
        project_id,
        api_type,
        thread_id,
        headers: Some(headers_json(headers)),
        request_payload,
        response_payload,
        status_code,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    if let Err(e) = state.store.record_api_history(entry).await {
        tracing::warn!("Failed to record {} API history: {}", api_type, e);
    }
}

const REDACTED_HEADERS: [HeaderName; 4] = [
    header::AUTHORIZATION,
    header::COOKIE,
    header::SET_COOKIE,
    header::PROXY_AUTHORIZATION,
];

/// Request headers as a JSON object, credentials left out.
///
/// Repeated headers are joined with ", "; non-UTF-8 values are skipped.
pub fn headers_json(headers: &HeaderMap) -> Value {
    let mut object = Map::new();
    for name in headers.keys() {
        if REDACTED_HEADERS.contains(name) {
            continue;
        }
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !values.is_empty() {
            object.insert(name.as_str().to_string(), Value::String(values.join(", ")));
        }
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_headers_json_drops_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc"));
        headers.append("x-trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));

        let value = headers_json(&headers);

        assert_eq!(value["content-type"], "application/json");
        assert_eq!(value["x-trace"], "a, b");
        assert!(value.get("authorization").is_none());
        assert!(value.get("cookie").is_none());
    }

    #[test]
    fn test_headers_json_empty() {
        assert_eq!(headers_json(&HeaderMap::new()), serde_json::json!({}));
    }
}
