use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

use super::{EngineQuery, QueryEngine, QueryResult};
use crate::error::{extract_error_message, AdaptorError};

/// HTTP client for the query engine
pub struct HttpQueryEngine {
    client: Client,
    base_url: String,
}

impl HttpQueryEngine {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn handle_response(&self, response: Response) -> Result<Response, AdaptorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AdaptorError::Upstream {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }
}

#[async_trait]
impl QueryEngine for HttpQueryEngine {
    async fn preview(&self, query: EngineQuery<'_>, limit: u32) -> Result<QueryResult, AdaptorError> {
        let url = format!("{}/v1/query", self.base_url);
        tracing::debug!("Previewing SQL (limit {}): {}", limit, query.sql);

        let response = self
            .client
            .post(&url)
            .query(&[("limit", limit)])
            .json(&query)
            .send()
            .await?;
        let response = self.handle_response(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| AdaptorError::Decode(e.to_string()))
    }

    async fn native_sql(&self, query: EngineQuery<'_>) -> Result<String, AdaptorError> {
        let url = format!("{}/v1/dry-plan", self.base_url);

        let response = self.client.post(&url).json(&query).send().await?;
        let response = self.handle_response(response).await?;

        let body = response.text().await?;
        // The planner answers either with a bare SQL string or a JSON string literal
        match serde_json::from_str::<String>(&body) {
            Ok(sql) => Ok(sql),
            Err(_) => Ok(body.trim().to_string()),
        }
    }
}
