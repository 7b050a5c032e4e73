#![allow(dead_code)]

use askdata_adaptor::{AdaptorError, ByteStream};
use askdata_flow::{ChatApi, FlowError, FlowEvent, Result};
use askdata_types::{
    AnswerDetail, ErrorBody, GenerateChartRequest, GenerateChartResponse, GenerateSqlRequest,
    GenerateSqlResponse, GenerateSummaryRequest, GenerateSummaryResponse, RunSqlRequest,
    RunSqlResponse, Thread, ThreadDetail, ThreadResponse,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Mutex;
use tokio::sync::{mpsc, Notify};

/// Scripted askdata API kept in memory
pub struct FakeApi {
    pub sql: Mutex<std::result::Result<String, ErrorBody>>,
    /// SQL that run_sql rejects as invalid
    pub rejected_sql: Mutex<Vec<String>>,
    pub summary_fails: bool,
    pub summary_chunks: Vec<&'static str>,
    pub explanation_chunks: Vec<&'static str>,
    pub store_down: bool,
    /// When set, generate_sql waits for a notification
    pub gate: Option<Notify>,
    pub calls: Mutex<Vec<String>>,
    pub threads: Mutex<Vec<Thread>>,
    pub responses: Mutex<Vec<ThreadResponse>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            sql: Mutex::new(Ok("SELECT month, revenue FROM orders".to_string())),
            rejected_sql: Mutex::new(Vec::new()),
            summary_fails: false,
            summary_chunks: vec![
                "data: {\"message\":\"Revenue \"}\n\n",
                "data: {\"message\":\"grew\"}\n\n",
                "data: {\"done\":true}\n\n",
            ],
            explanation_chunks: vec![],
            store_down: false,
            gate: None,
            calls: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
        }
    }
}

fn stream_of(chunks: &[&'static str]) -> ByteStream {
    let chunks: Vec<_> = chunks
        .iter()
        .map(|c| Ok::<Bytes, AdaptorError>(Bytes::from_static(c.as_bytes())))
        .collect();
    Box::pin(futures::stream::iter(chunks))
}

fn api_error(status: u16, error: &str, code: &str) -> FlowError {
    FlowError::from_body(
        status,
        ErrorBody {
            error: error.to_string(),
            code: Some(code.to_string()),
            ..Default::default()
        },
    )
}

impl FakeApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn store_check(&self) -> Result<()> {
        if self.store_down {
            return Err(api_error(500, "Storage error", "INTERNAL_SERVER_ERROR"));
        }
        Ok(())
    }

    /// Seed a thread with responses given as (question, sql)
    pub fn seed_thread(&self, responses: &[(&str, Option<&str>)]) -> i64 {
        let mut threads = self.threads.lock().unwrap();
        let thread_id = threads.len() as i64 + 1;
        threads.push(Thread {
            id: thread_id,
            summary: "seeded".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        drop(threads);

        for (question, sql) in responses {
            self.insert_response(thread_id, question, sql.map(str::to_string));
        }
        thread_id
    }

    fn insert_response(&self, thread_id: i64, question: &str, sql: Option<String>) -> ThreadResponse {
        let mut responses = self.responses.lock().unwrap();
        let response = ThreadResponse {
            id: responses.len() as i64 + 1,
            thread_id,
            question: question.to_string(),
            sql,
            answer_detail: None,
            chart_detail: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        responses.push(response.clone());
        response
    }

    fn update_response<F: FnOnce(&mut ThreadResponse)>(&self, id: i64, f: F) -> Result<ThreadResponse> {
        let mut responses = self.responses.lock().unwrap();
        let response = responses
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| api_error(404, "Response not found", "NOT_FOUND"))?;
        f(response);
        Ok(response.clone())
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn generate_sql(&self, req: &GenerateSqlRequest) -> Result<GenerateSqlResponse> {
        self.log("generate_sql");
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let outcome = self.sql.lock().unwrap().clone();
        match outcome {
            Ok(sql) => Ok(GenerateSqlResponse {
                sql,
                thread_id: req.thread_id.clone().unwrap_or_else(|| "fresh".to_string()),
            }),
            Err(body) => Err(FlowError::from_body(400, body)),
        }
    }

    async fn run_sql(&self, req: &RunSqlRequest) -> Result<RunSqlResponse> {
        self.log(format!("run_sql:{}", req.sql));
        if self.rejected_sql.lock().unwrap().contains(&req.sql) {
            return Err(FlowError::from_body(
                400,
                ErrorBody {
                    error: "column not found".to_string(),
                    code: Some("INVALID_SQL_ERROR".to_string()),
                    invalid_sql: Some(req.sql.clone()),
                    ..Default::default()
                },
            ));
        }
        Ok(serde_json::from_value(serde_json::json!({
            "records": [{"month": "2024-01", "revenue": 10.5}],
            "columns": [{"name": "month", "type": "VARCHAR"}, {"name": "revenue", "type": "DOUBLE"}],
            "totalRows": 1,
            "threadId": req.thread_id.clone().unwrap_or_default()
        }))
        .unwrap())
    }

    async fn generate_summary(&self, req: &GenerateSummaryRequest) -> Result<GenerateSummaryResponse> {
        self.log("generate_summary");
        if self.summary_fails {
            return Err(api_error(500, "Summary generation failed", "INTERNAL_SERVER_ERROR"));
        }
        Ok(GenerateSummaryResponse {
            explanation_query_id: "answer-1".to_string(),
            thread_id: req.thread_id.clone().unwrap_or_default(),
        })
    }

    async fn generate_chart(&self, _req: &GenerateChartRequest) -> Result<GenerateChartResponse> {
        self.log("generate_chart");
        Err(api_error(500, "not scripted", "INTERNAL_SERVER_ERROR"))
    }

    async fn stream_summary(&self, query_id: &str) -> Result<ByteStream> {
        self.log(format!("stream_summary:{}", query_id));
        Ok(stream_of(&self.summary_chunks))
    }

    async fn stream_explanation(&self, query_id: &str) -> Result<ByteStream> {
        self.log(format!("stream_explanation:{}", query_id));
        Ok(stream_of(&self.explanation_chunks))
    }

    async fn list_threads(&self) -> Result<Vec<Thread>> {
        self.store_check()?;
        Ok(self.threads.lock().unwrap().clone())
    }

    async fn create_thread(&self, summary: &str) -> Result<Thread> {
        self.store_check()?;
        self.log("create_thread");
        let mut threads = self.threads.lock().unwrap();
        let thread = Thread {
            id: threads.len() as i64 + 1,
            summary: summary.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        threads.push(thread.clone());
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: i64) -> Result<ThreadDetail> {
        self.store_check()?;
        let thread = self
            .threads
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == thread_id)
            .cloned()
            .ok_or_else(|| api_error(404, "Thread not found", "NOT_FOUND"))?;
        let responses = self
            .responses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.thread_id == thread_id)
            .cloned()
            .collect();
        Ok(ThreadDetail { thread, responses })
    }

    async fn create_response(
        &self,
        thread_id: i64,
        question: &str,
        sql: Option<&str>,
    ) -> Result<ThreadResponse> {
        self.store_check()?;
        self.log("create_response");
        Ok(self.insert_response(thread_id, question, sql.map(str::to_string)))
    }

    async fn update_response_sql(
        &self,
        _thread_id: i64,
        response_id: i64,
        sql: &str,
    ) -> Result<ThreadResponse> {
        self.store_check()?;
        self.log(format!("update_sql:{}:{}", response_id, sql));
        self.update_response(response_id, |r| r.sql = Some(sql.to_string()))
    }

    async fn update_response_answer(
        &self,
        _thread_id: i64,
        response_id: i64,
        answer: AnswerDetail,
    ) -> Result<ThreadResponse> {
        self.store_check()?;
        self.log(format!(
            "update_answer:{}:{}",
            response_id,
            answer.content.clone().unwrap_or_default()
        ));
        self.update_response(response_id, |r| r.answer_detail = Some(answer))
    }
}

pub async fn collect(mut events: mpsc::Receiver<FlowEvent>) -> Vec<FlowEvent> {
    let mut all = Vec::new();
    while let Some(event) = events.recv().await {
        all.push(event);
    }
    all
}
