use askdata_adaptor::{AdaptorError, EngineQuery, HttpQueryEngine, QueryEngine};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_preview_sends_limit_and_manifest() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/query")
        .match_query(Matcher::UrlEncoded("limit".into(), "500".into()))
        .match_body(Matcher::PartialJson(json!({
            "sql": "SELECT * FROM orders",
            "dataSource": "duckdb"
        })))
        .with_status(200)
        .with_body(r#"{"columns":[{"name":"id","type":"INTEGER"}],"data":[[1],[2]]}"#)
        .create_async()
        .await;

    let engine = HttpQueryEngine::new(server.url(), Duration::from_secs(5)).unwrap();
    let manifest = json!({"models": []});
    let result = engine
        .preview(
            EngineQuery {
                sql: "SELECT * FROM orders",
                manifest: &manifest,
                data_source: "duckdb",
            },
            500,
        )
        .await
        .unwrap();

    assert_eq!(result.columns[0].name, "id");
    assert_eq!(result.data.len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_preview_failure_keeps_engine_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/query")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"message":"Table \"ordrs\" does not exist"}"#)
        .create_async()
        .await;

    let engine = HttpQueryEngine::new(server.url(), Duration::from_secs(5)).unwrap();
    let manifest = json!({});
    let err = engine
        .preview(
            EngineQuery {
                sql: "SELECT * FROM ordrs",
                manifest: &manifest,
                data_source: "duckdb",
            },
            10,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AdaptorError::Upstream { status: 400, .. }));
    assert_eq!(err.message(), "Table \"ordrs\" does not exist");
}

#[tokio::test]
async fn test_native_sql_accepts_json_string() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/dry-plan")
        .with_status(200)
        .with_body(r#""SELECT \"id\" FROM \"main\".\"orders\"""#)
        .create_async()
        .await;

    let engine = HttpQueryEngine::new(server.url(), Duration::from_secs(5)).unwrap();
    let manifest = json!({});
    let sql = engine
        .native_sql(EngineQuery {
            sql: "SELECT id FROM orders",
            manifest: &manifest,
            data_source: "postgres",
        })
        .await
        .unwrap();

    assert_eq!(sql, r#"SELECT "id" FROM "main"."orders""#);
}
