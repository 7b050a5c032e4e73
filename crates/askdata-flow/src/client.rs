use anyhow::Context;
use askdata_adaptor::{response_bytes, ByteStream};
use askdata_types::{
    AnswerDetail, CreateResponseRequest, CreateThreadRequest, ErrorBody, GenerateChartRequest,
    GenerateChartResponse, GenerateSqlRequest, GenerateSqlResponse, GenerateSummaryRequest,
    GenerateSummaryResponse, ResponseEnvelope, RunSqlRequest, RunSqlResponse, Thread,
    ThreadDetail, ThreadDetailEnvelope, ThreadEnvelope, ThreadResponse, ThreadsEnvelope,
    UpdateAnswerRequest, UpdateSqlRequest,
};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::{FlowError, Result};

/// The askdata HTTP API as seen by a chat client
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn generate_sql(&self, req: &GenerateSqlRequest) -> Result<GenerateSqlResponse>;

    async fn run_sql(&self, req: &RunSqlRequest) -> Result<RunSqlResponse>;

    async fn generate_summary(&self, req: &GenerateSummaryRequest)
        -> Result<GenerateSummaryResponse>;

    async fn generate_chart(&self, req: &GenerateChartRequest) -> Result<GenerateChartResponse>;

    async fn stream_summary(&self, query_id: &str) -> Result<ByteStream>;

    async fn stream_explanation(&self, query_id: &str) -> Result<ByteStream>;

    async fn list_threads(&self) -> Result<Vec<Thread>>;

    async fn create_thread(&self, summary: &str) -> Result<Thread>;

    async fn get_thread(&self, thread_id: i64) -> Result<ThreadDetail>;

    async fn create_response(
        &self,
        thread_id: i64,
        question: &str,
        sql: Option<&str>,
    ) -> Result<ThreadResponse>;

    async fn update_response_sql(
        &self,
        thread_id: i64,
        response_id: i64,
        sql: &str,
    ) -> Result<ThreadResponse>;

    async fn update_response_answer(
        &self,
        thread_id: i64,
        response_id: i64,
        answer: AnswerDetail,
    ) -> Result<ThreadResponse>;
}

pub struct HttpChatApi {
    client: Client,
    base_url: String,
}

impl HttpChatApi {
    /// `base_url` is the server root, e.g. "http://localhost:3000"
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        decode_json(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        decode_json(response).await
    }

    async fn open_stream(&self, path: &str, query_id: &str) -> Result<ByteStream> {
        let response = self
            .client
            .get(self.url(path))
            .query(&[("queryId", query_id)])
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response_bytes(response))
    }
}

/// Decode the API's error envelope from non-2xx responses
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| ErrorBody {
        error: if text.trim().is_empty() {
            status.to_string()
        } else {
            text.trim().to_string()
        },
        ..Default::default()
    });
    tracing::debug!("API returned {}: {}", status, body.error);

    Err(FlowError::from_body(status.as_u16(), body))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| FlowError::Decode(format!("{}: {}", e, body)))
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn generate_sql(&self, req: &GenerateSqlRequest) -> Result<GenerateSqlResponse> {
        self.post_json("/api/v1/generate_sql", req).await
    }

    async fn run_sql(&self, req: &RunSqlRequest) -> Result<RunSqlResponse> {
        self.post_json("/api/v1/run_sql", req).await
    }

    async fn generate_summary(
        &self,
        req: &GenerateSummaryRequest,
    ) -> Result<GenerateSummaryResponse> {
        self.post_json("/api/v1/generate_summary", req).await
    }

    async fn generate_chart(&self, req: &GenerateChartRequest) -> Result<GenerateChartResponse> {
        self.post_json("/api/v1/generate_vega_chart", req).await
    }

    async fn stream_summary(&self, query_id: &str) -> Result<ByteStream> {
        self.open_stream("/api/v1/stream_summary", query_id).await
    }

    async fn stream_explanation(&self, query_id: &str) -> Result<ByteStream> {
        self.open_stream("/api/v1/stream_explanation", query_id).await
    }

    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let envelope: ThreadsEnvelope = self.get_json("/api/v1/threads").await?;
        Ok(envelope.threads)
    }

    async fn create_thread(&self, summary: &str) -> Result<Thread> {
        let envelope: ThreadEnvelope = self
            .post_json(
                "/api/v1/threads",
                &CreateThreadRequest {
                    summary: summary.to_string(),
                },
            )
            .await?;
        Ok(envelope.thread)
    }

    async fn get_thread(&self, thread_id: i64) -> Result<ThreadDetail> {
        let envelope: ThreadDetailEnvelope = self
            .get_json(&format!("/api/v1/threads/{}", thread_id))
            .await?;
        Ok(envelope.thread)
    }

    async fn create_response(
        &self,
        thread_id: i64,
        question: &str,
        sql: Option<&str>,
    ) -> Result<ThreadResponse> {
        let envelope: ResponseEnvelope = self
            .post_json(
                &format!("/api/v1/threads/{}/responses", thread_id),
                &CreateResponseRequest {
                    question: question.to_string(),
                    sql: sql.map(str::to_string),
                },
            )
            .await?;
        Ok(envelope.response)
    }

    async fn update_response_sql(
        &self,
        thread_id: i64,
        response_id: i64,
        sql: &str,
    ) -> Result<ThreadResponse> {
        let envelope: ResponseEnvelope = self
            .post_json(
                &format!("/api/v1/threads/{}/responses/{}/sql", thread_id, response_id),
                &UpdateSqlRequest {
                    sql: sql.to_string(),
                },
            )
            .await?;
        Ok(envelope.response)
    }

    async fn update_response_answer(
        &self,
        thread_id: i64,
        response_id: i64,
        answer: AnswerDetail,
    ) -> Result<ThreadResponse> {
        let envelope: ResponseEnvelope = self
            .post_json(
                &format!(
                    "/api/v1/threads/{}/responses/{}/answer",
                    thread_id, response_id
                ),
                &UpdateAnswerRequest {
                    status: Some(answer.status),
                    content: answer.content,
                },
            )
            .await?;
        Ok(envelope.response)
    }
}
