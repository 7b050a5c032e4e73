#![allow(dead_code)]

use askdata_adaptor::{
    AdaptorError, AnalyticsAi, AskInput, AskResult, AskStatus, AsyncQuery, ByteStream, ChartInput,
    ChartResult, ChartStatus, EngineQuery, QueryEngine, QueryResult, TextBasedAnswerInput,
    TextBasedAnswerResult, TextBasedAnswerStatus,
};
use askdata_api::{build_router, config::Config, state::AppState};
use askdata_persist::{NewProject, SqliteStore, ThreadStore};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Scripted AI service.
///
/// Result queues are popped on each poll; the last entry repeats.
pub struct FakeAi {
    pub ask_results: Mutex<VecDeque<AskResult>>,
    pub answer_results: Mutex<VecDeque<TextBasedAnswerResult>>,
    pub chart_results: Mutex<VecDeque<ChartResult>>,
    pub asks: Mutex<Vec<AskInput>>,
    pub stopped: Mutex<Vec<String>>,
    pub ask_polls: AtomicUsize,
    pub stream_chunks: Mutex<Vec<&'static [u8]>>,
    /// Keep the stream open after the scripted chunks
    pub stream_hangs: AtomicBool,
    pub stream_fails_mid_way: AtomicBool,
    pub stream_dropped: Arc<AtomicBool>,
    pub opened_streams: Mutex<Vec<String>>,
    /// Hold `ask` submissions for this long before answering
    pub ask_delay: Mutex<Option<Duration>>,
}

impl Default for FakeAi {
    fn default() -> Self {
        Self {
            ask_results: Mutex::new(VecDeque::from([ask_finished("SELECT 1")])),
            answer_results: Mutex::new(VecDeque::from([TextBasedAnswerResult {
                status: TextBasedAnswerStatus::Succeeded,
                num_rows_used_in_llm: Some(2),
                error: None,
            }])),
            chart_results: Mutex::new(VecDeque::new()),
            asks: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
            ask_polls: AtomicUsize::new(0),
            stream_chunks: Mutex::new(Vec::new()),
            stream_hangs: AtomicBool::new(false),
            stream_fails_mid_way: AtomicBool::new(false),
            stream_dropped: Arc::new(AtomicBool::new(false)),
            opened_streams: Mutex::new(Vec::new()),
            ask_delay: Mutex::new(None),
        }
    }
}

fn next_of<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

pub fn ask_status(status: AskStatus) -> AskResult {
    AskResult {
        status,
        result_type: None,
        response: vec![],
        invalid_sql: None,
        error: None,
    }
}

pub fn ask_finished(sql: &str) -> AskResult {
    serde_json::from_value(json!({
        "status": "finished",
        "type": "TEXT_TO_SQL",
        "response": [{"sql": sql}]
    }))
    .unwrap()
}

impl FakeAi {
    pub fn with_ask_results(results: Vec<AskResult>) -> Self {
        Self {
            ask_results: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    pub fn with_stream(chunks: Vec<&'static [u8]>) -> Self {
        Self {
            stream_chunks: Mutex::new(chunks),
            ..Default::default()
        }
    }

    fn upstream_stream(&self) -> ByteStream {
        struct DropFlag(Arc<AtomicBool>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let guard = DropFlag(Arc::clone(&self.stream_dropped));
        let chunks = self.stream_chunks.lock().unwrap().clone();
        let hangs = self.stream_hangs.load(Ordering::SeqCst);
        let fails = self.stream_fails_mid_way.load(Ordering::SeqCst);

        Box::pin(async_stream::stream! {
            let _guard = guard;
            for chunk in chunks {
                yield Ok::<Bytes, AdaptorError>(Bytes::from_static(chunk));
            }
            if fails {
                yield Err(AdaptorError::Stream("connection reset".to_string()));
                return;
            }
            if hangs {
                futures::future::pending::<()>().await;
            }
        })
    }
}

#[async_trait]
impl AnalyticsAi for FakeAi {
    async fn ask(&self, input: AskInput) -> Result<AsyncQuery, AdaptorError> {
        self.asks.lock().unwrap().push(input);
        let delay = *self.ask_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(AsyncQuery {
            query_id: "ask-1".to_string(),
        })
    }

    async fn get_ask_result(&self, _query_id: &str) -> Result<AskResult, AdaptorError> {
        self.ask_polls.fetch_add(1, Ordering::SeqCst);
        next_of(&self.ask_results).ok_or_else(|| AdaptorError::Decode("no ask result".to_string()))
    }

    async fn stop_ask(&self, query_id: &str) -> Result<(), AdaptorError> {
        self.stopped.lock().unwrap().push(query_id.to_string());
        Ok(())
    }

    async fn stream_ask_explanation(&self, query_id: &str) -> Result<ByteStream, AdaptorError> {
        self.opened_streams.lock().unwrap().push(query_id.to_string());
        Ok(self.upstream_stream())
    }

    async fn create_text_based_answer(
        &self,
        _input: TextBasedAnswerInput,
    ) -> Result<AsyncQuery, AdaptorError> {
        Ok(AsyncQuery {
            query_id: "answer-1".to_string(),
        })
    }

    async fn get_text_based_answer_result(
        &self,
        _query_id: &str,
    ) -> Result<TextBasedAnswerResult, AdaptorError> {
        next_of(&self.answer_results)
            .ok_or_else(|| AdaptorError::Decode("no answer result".to_string()))
    }

    async fn stream_text_based_answer(&self, query_id: &str) -> Result<ByteStream, AdaptorError> {
        if query_id == "missing" {
            return Err(AdaptorError::Upstream {
                status: 404,
                message: "Query not found".to_string(),
            });
        }
        self.opened_streams.lock().unwrap().push(query_id.to_string());
        Ok(self.upstream_stream())
    }

    async fn generate_chart(&self, _input: ChartInput) -> Result<AsyncQuery, AdaptorError> {
        Ok(AsyncQuery {
            query_id: "chart-1".to_string(),
        })
    }

    async fn get_chart_result(&self, _query_id: &str) -> Result<ChartResult, AdaptorError> {
        Ok(next_of(&self.chart_results).unwrap_or(ChartResult {
            status: ChartStatus::Failed,
            response: None,
            error: None,
        }))
    }
}

/// Query engine answering every preview with the same rows, or rejecting SQL
pub struct FakeEngine {
    pub result: Result<QueryResult, String>,
    pub native: String,
    pub previews: Mutex<Vec<(String, u32)>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            result: Ok(serde_json::from_value(json!({
                "columns": [{"name": "month", "type": "VARCHAR"}, {"name": "revenue", "type": "DOUBLE"}],
                "data": [["2024-01", 10.5], ["2024-02", 12.0]]
            }))
            .unwrap()),
            native: "SELECT 1 AS native".to_string(),
            previews: Mutex::new(Vec::new()),
        }
    }
}

impl FakeEngine {
    pub fn rejecting(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl QueryEngine for FakeEngine {
    async fn preview(&self, query: EngineQuery<'_>, limit: u32) -> Result<QueryResult, AdaptorError> {
        self.previews
            .lock()
            .unwrap()
            .push((query.sql.to_string(), limit));
        self.result.clone().map_err(|message| AdaptorError::Upstream {
            status: 400,
            message,
        })
    }

    async fn native_sql(&self, _query: EngineQuery<'_>) -> Result<String, AdaptorError> {
        Ok(self.native.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteStore>,
    pub ai: Arc<FakeAi>,
    pub engine: Arc<FakeEngine>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.polling.interval_ms = 5;
    config.polling.max_wait_ms = 60;
    config
}

pub async fn app(ai: FakeAi, engine: FakeEngine, deployed: bool) -> TestApp {
    app_with_config(test_config(), ai, engine, deployed).await
}

pub async fn app_with_config(
    config: Config,
    ai: FakeAi,
    engine: FakeEngine,
    deployed: bool,
) -> TestApp {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    if deployed {
        let project = store
            .create_project(NewProject {
                display_name: "sales".to_string(),
                data_source: "duckdb".to_string(),
                language: None,
            })
            .await
            .unwrap();
        store
            .record_deployment(project.id, "hash-1", &json!({"models": []}))
            .await
            .unwrap();
    }

    let ai = Arc::new(ai);
    let engine = Arc::new(engine);
    let state = AppState::new(
        config,
        store.clone() as Arc<dyn ThreadStore>,
        ai.clone() as Arc<dyn AnalyticsAi>,
        engine.clone() as Arc<dyn QueryEngine>,
    );

    TestApp {
        router: build_router(Arc::new(state)),
        store,
        ai,
        engine,
    }
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        self.dispatch(request).await
    }

    /// Send a body verbatim with only the given headers set
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let request = request.body(Body::from(body.to_string())).unwrap();
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }
}
