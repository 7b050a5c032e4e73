use askdata_persist::{
    AnswerDetail, AnswerStatus, ApiType, ChartDetail, NewApiHistory, NewProject, PersistError,
    SqliteStore, ThreadStore,
};
use serde_json::json;

async fn store() -> SqliteStore {
    SqliteStore::in_memory().await.unwrap()
}

#[tokio::test]
async fn test_thread_and_responses_round_trip() {
    let store = store().await;

    let thread = store.create_thread("Monthly revenue").await.unwrap();
    let first = store
        .create_response(thread.id, "What was revenue in May?", None)
        .await
        .unwrap();
    let second = store
        .create_response(thread.id, "And in June?", Some("SELECT 2"))
        .await
        .unwrap();

    let detail = store.get_thread_detail(thread.id).await.unwrap().unwrap();
    assert_eq!(detail.thread.summary, "Monthly revenue");
    let ids: Vec<i64> = detail.responses.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(detail.responses[1].sql.as_deref(), Some("SELECT 2"));
    assert!(detail.responses[0].sql.is_none());
}

#[tokio::test]
async fn test_thread_fetch_is_idempotent() {
    let store = store().await;
    let thread = store.create_thread("Churn").await.unwrap();
    store.create_response(thread.id, "Who churned?", None).await.unwrap();

    let a = store.get_thread_detail(thread.id).await.unwrap();
    let b = store.get_thread_detail(thread.id).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_sql_update_then_read_back() {
    let store = store().await;
    let thread = store.create_thread("t").await.unwrap();
    let response = store.create_response(thread.id, "q", None).await.unwrap();

    store
        .update_response_sql(response.id, "SELECT amount FROM orders")
        .await
        .unwrap();
    let fixed = store
        .update_response_sql(response.id, "SELECT total FROM orders")
        .await
        .unwrap();

    assert_eq!(fixed.sql.as_deref(), Some("SELECT total FROM orders"));
    let reread = store.get_response(response.id).await.unwrap().unwrap();
    assert_eq!(reread.sql.as_deref(), Some("SELECT total FROM orders"));
}

#[tokio::test]
async fn test_answer_and_chart_details_persist() {
    let store = store().await;
    let thread = store.create_thread("t").await.unwrap();
    let response = store.create_response(thread.id, "q", Some("SELECT 1")).await.unwrap();

    store
        .update_response_answer(
            response.id,
            AnswerDetail {
                status: AnswerStatus::Finished,
                content: Some("Revenue doubled.".to_string()),
            },
        )
        .await
        .unwrap();
    let updated = store
        .update_response_chart(
            response.id,
            ChartDetail {
                chart_schema: Some(json!({"mark": "bar"})),
                error: None,
            },
        )
        .await
        .unwrap();

    let answer = updated.answer_detail.unwrap();
    assert_eq!(answer.status, AnswerStatus::Finished);
    assert_eq!(answer.content.as_deref(), Some("Revenue doubled."));
    assert_eq!(updated.chart_detail.unwrap().chart_schema.unwrap()["mark"], "bar");
    // SQL is untouched by answer/chart writes
    assert_eq!(updated.sql.as_deref(), Some("SELECT 1"));
}

#[tokio::test]
async fn test_missing_rows_are_reported() {
    let store = store().await;

    assert!(store.get_thread(42).await.unwrap().is_none());
    assert!(store.get_thread_detail(42).await.unwrap().is_none());
    assert!(matches!(
        store.create_response(42, "q", None).await,
        Err(PersistError::ThreadNotFound(42))
    ));
    assert!(matches!(
        store.list_responses(42).await,
        Err(PersistError::ThreadNotFound(42))
    ));
    assert!(matches!(
        store.update_response_sql(7, "SELECT 1").await,
        Err(PersistError::ResponseNotFound(7))
    ));
}

#[tokio::test]
async fn test_last_deployment_of_current_project() {
    let store = store().await;
    assert!(store.current_project().await.unwrap().is_none());

    let project = store
        .create_project(NewProject {
            display_name: "shop".to_string(),
            data_source: "duckdb".to_string(),
            language: Some("English".to_string()),
        })
        .await
        .unwrap();
    assert!(store.last_deployment(project.id).await.unwrap().is_none());

    store
        .record_deployment(project.id, "hash-1", &json!({"models": []}))
        .await
        .unwrap();
    store
        .record_deployment(project.id, "hash-2", &json!({"models": [{"name": "orders"}]}))
        .await
        .unwrap();

    let current = store.current_project().await.unwrap().unwrap();
    assert_eq!(current.id, project.id);
    let last = store.last_deployment(project.id).await.unwrap().unwrap();
    assert_eq!(last.hash, "hash-2");
    assert_eq!(last.manifest["models"][0]["name"], "orders");
    assert!(store.find_deployment(project.id, "hash-1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_api_history_filters_successful_calls() {
    let store = store().await;

    for (status, sql) in [(200u16, "SELECT 1"), (400, ""), (200, "SELECT 2")] {
        store
            .record_api_history(NewApiHistory {
                project_id: None,
                api_type: ApiType::GenerateSql,
                thread_id: Some("thread-a".to_string()),
                headers: None,
                request_payload: Some(json!({"question": format!("q{}", sql)})),
                response_payload: Some(json!({"sql": sql})),
                status_code: status,
                duration_ms: 12,
            })
            .await
            .unwrap();
    }
    store
        .record_api_history(NewApiHistory {
            project_id: None,
            api_type: ApiType::RunSql,
            thread_id: Some("thread-a".to_string()),
            headers: None,
            request_payload: None,
            response_payload: None,
            status_code: 200,
            duration_ms: 3,
        })
        .await
        .unwrap();

    let history = store
        .api_history_for_thread("thread-a", ApiType::GenerateSql)
        .await
        .unwrap();
    let sqls: Vec<&str> = history
        .iter()
        .map(|h| h.response_payload.as_ref().unwrap()["sql"].as_str().unwrap())
        .collect();
    assert_eq!(sqls, vec!["SELECT 1", "SELECT 2"]);
    assert!(store
        .api_history_for_thread("thread-b", ApiType::GenerateSql)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_health_check() {
    store().await.health_check().await.unwrap();
}
