mod common;

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{app, app_with_config, test_config, FakeAi, FakeEngine};
use serde_json::json;

#[tokio::test]
async fn test_thread_lifecycle() {
    let app = app(FakeAi::default(), FakeEngine::default(), true).await;

    let (status, body) = app
        .post("/api/v1/threads", json!({"summary": "Revenue questions"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let thread_id = body["thread"]["id"].as_i64().unwrap();
    assert_eq!(body["thread"]["summary"], "Revenue questions");

    let (status, body) = app
        .post(
            &format!("/api/v1/threads/{}/responses", thread_id),
            json!({"question": "revenue by month"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let response_id = body["response"]["id"].as_i64().unwrap();
    assert!(body["response"]["sql"].is_null());

    let (status, body) = app
        .post(
            &format!("/api/v1/threads/{}/responses/{}/sql", thread_id, response_id),
            json!({"sql": "SELECT 1"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["sql"], "SELECT 1");

    let (status, body) = app
        .post(
            &format!("/api/v1/threads/{}/responses/{}/answer", thread_id, response_id),
            json!({"content": "Revenue grew 14%"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["answerDetail"]["status"], "FINISHED");
    assert_eq!(body["response"]["answerDetail"]["content"], "Revenue grew 14%");

    let (status, body) = app.get(&format!("/api/v1/threads/{}", thread_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["thread"]["id"], thread_id);
    assert_eq!(body["thread"]["responses"].as_array().unwrap().len(), 1);

    let (status, body) = app.get("/api/v1/threads").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threads"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .get(&format!("/api/v1/threads/{}/responses", thread_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["responses"][0]["question"], "revenue by month");
}

#[tokio::test]
async fn test_create_thread_requires_summary() {
    let app = app(FakeAi::default(), FakeEngine::default(), true).await;

    let (status, body) = app.post("/api/v1/threads", json!({"summary": ""})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Summary is required");
}

#[tokio::test]
async fn test_invalid_ids_are_rejected() {
    let app = app(FakeAi::default(), FakeEngine::default(), true).await;

    let (status, body) = app.get("/api/v1/threads/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid thread ID");

    let (status, body) = app
        .post("/api/v1/threads/1/responses/xyz/sql", json!({"sql": "SELECT 1"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid response ID");
}

#[tokio::test]
async fn test_missing_rows_are_404() {
    let app = app(FakeAi::default(), FakeEngine::default(), true).await;

    let (status, body) = app.get("/api/v1/threads/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Thread not found");

    let (status, body) = app
        .post("/api/v1/threads/999/responses", json!({"question": "q"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Thread not found");

    let (status, body) = app.get("/api/v1/threads/999/responses").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Thread not found");

    let (status, body) = app
        .post("/api/v1/threads/1/responses/42/sql", json!({"sql": "SELECT 1"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Response not found");
}

#[tokio::test]
async fn test_response_of_other_thread_is_404() {
    let app = app(FakeAi::default(), FakeEngine::default(), true).await;

    let (_, a) = app.post("/api/v1/threads", json!({"summary": "a"})).await;
    let (_, b) = app.post("/api/v1/threads", json!({"summary": "b"})).await;
    let a_id = a["thread"]["id"].as_i64().unwrap();
    let b_id = b["thread"]["id"].as_i64().unwrap();

    let (_, created) = app
        .post(
            &format!("/api/v1/threads/{}/responses", a_id),
            json!({"question": "q"}),
        )
        .await;
    let response_id = created["response"]["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            &format!("/api/v1/threads/{}/responses/{}/sql", b_id, response_id),
            json!({"sql": "SELECT 1"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_config_endpoint() {
    let mut config = test_config();
    config.posthog_api_key = "phc_secret".to_string();
    config.telemetry.enabled = true;
    config.telemetry.posthog_host = "https://eu.posthog.com".to_string();
    config.telemetry.user_uuid = "user-1".to_string();
    let app = app_with_config(config, FakeAi::default(), FakeEngine::default(), false).await;

    let (status, body) = app.get("/api/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isTelemetryEnabled"], true);
    assert_eq!(body["telemetryKey"], STANDARD.encode("phc_secret"));
    assert_eq!(body["telemetryHost"], "https://eu.posthog.com");
    assert_eq!(body["userUUID"], "user-1");
}

#[tokio::test]
async fn test_config_without_key() {
    let app = app(FakeAi::default(), FakeEngine::default(), false).await;

    let (_, body) = app.get("/api/config").await;

    assert_eq!(body["telemetryKey"], "");
    assert_eq!(body["isTelemetryEnabled"], false);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = app(FakeAi::default(), FakeEngine::default(), true).await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"], "connected");
    assert_eq!(body["services"]["deployment"], "hash-1");

    let (status, body) = app.get("/api/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/run_sql"].is_object());
}
