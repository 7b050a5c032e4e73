use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::{
    AskInput, AskResult, AsyncQuery, ChartInput, ChartResult, TextBasedAnswerInput,
    TextBasedAnswerResult,
};
use super::AnalyticsAi;
use crate::error::{extract_error_message, AdaptorError};
use crate::streaming::{response_bytes, ByteStream};

/// HTTP client for the analytics AI service
///
/// JSON calls carry a per-request timeout. Streaming calls do not, since
/// an answer may legitimately stream for longer than any fixed bound.
pub struct HttpAnalyticsAi {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpAnalyticsAi {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Service endpoint (e.g., "http://localhost:5555")
    /// * `timeout` - Timeout applied to every non-streaming request
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .with_context(|| format!("Invalid AI service URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("AI service URL cannot carry a path: {}", base_url);
        }

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Service URL with `segments` appended, each percent-encoded as one segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, AdaptorError> {
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        decode_json(response).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, AdaptorError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;
        decode_json(response).await
    }

    async fn open_stream(&self, url: Url) -> Result<ByteStream, AdaptorError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response_bytes(response))
    }
}

/// Map non-2xx responses to `AdaptorError::Upstream`
async fn check_status(response: Response) -> Result<Response, AdaptorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body);
    tracing::warn!("Upstream returned {}: {}", status, message);

    Err(AdaptorError::Upstream {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.to_string()
        } else {
            message
        },
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, AdaptorError> {
    let response = check_status(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| AdaptorError::Decode(format!("{}: {}", e, body)))
}

#[async_trait]
impl AnalyticsAi for HttpAnalyticsAi {
    async fn ask(&self, input: AskInput) -> Result<AsyncQuery, AdaptorError> {
        tracing::debug!("Creating ask task for question: {}", input.query);
        self.post_json(self.endpoint(&["v1", "asks"]), &input).await
    }

    async fn get_ask_result(&self, query_id: &str) -> Result<AskResult, AdaptorError> {
        self.get_json(self.endpoint(&["v1", "asks", query_id, "result"]))
            .await
    }

    async fn stop_ask(&self, query_id: &str) -> Result<(), AdaptorError> {
        let url = self.endpoint(&["v1", "asks", query_id]);
        let response = self
            .client
            .patch(url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "status": "stopped" }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn stream_ask_explanation(&self, query_id: &str) -> Result<ByteStream, AdaptorError> {
        self.open_stream(self.endpoint(&["v1", "asks", query_id, "streaming-result"]))
            .await
    }

    async fn create_text_based_answer(
        &self,
        input: TextBasedAnswerInput,
    ) -> Result<AsyncQuery, AdaptorError> {
        self.post_json(self.endpoint(&["v1", "sql-answers"]), &input).await
    }

    async fn get_text_based_answer_result(
        &self,
        query_id: &str,
    ) -> Result<TextBasedAnswerResult, AdaptorError> {
        self.get_json(self.endpoint(&["v1", "sql-answers", query_id]))
            .await
    }

    async fn stream_text_based_answer(&self, query_id: &str) -> Result<ByteStream, AdaptorError> {
        self.open_stream(self.endpoint(&["v1", "sql-answers", query_id, "streaming"]))
            .await
    }

    async fn generate_chart(&self, input: ChartInput) -> Result<AsyncQuery, AdaptorError> {
        self.post_json(self.endpoint(&["v1", "charts"]), &input).await
    }

    async fn get_chart_result(&self, query_id: &str) -> Result<ChartResult, AdaptorError> {
        self.get_json(self.endpoint(&["v1", "charts", query_id]))
            .await
    }
}
