mod client;
mod types;

pub use client::HttpAnalyticsAi;
pub use types::*;

use async_trait::async_trait;

use crate::error::AdaptorError;
use crate::streaming::ByteStream;

/// Client for the analytics AI service.
///
/// Every generation is an asynchronous task: `create` returns a query id,
/// the result endpoint is polled until terminal and, for text answers, the
/// tokens are read from a separate SSE endpoint.
#[async_trait]
pub trait AnalyticsAi: Send + Sync {
    /// Start text-to-SQL generation
    async fn ask(&self, input: AskInput) -> Result<AsyncQuery, AdaptorError>;

    async fn get_ask_result(&self, query_id: &str) -> Result<AskResult, AdaptorError>;

    /// Ask the service to stop working on a task
    async fn stop_ask(&self, query_id: &str) -> Result<(), AdaptorError>;

    /// Explanation stream for questions classified as non-SQL
    async fn stream_ask_explanation(&self, query_id: &str) -> Result<ByteStream, AdaptorError>;

    /// Start a natural-language summary of query results
    async fn create_text_based_answer(
        &self,
        input: TextBasedAnswerInput,
    ) -> Result<AsyncQuery, AdaptorError>;

    async fn get_text_based_answer_result(
        &self,
        query_id: &str,
    ) -> Result<TextBasedAnswerResult, AdaptorError>;

    async fn stream_text_based_answer(&self, query_id: &str) -> Result<ByteStream, AdaptorError>;

    /// Start chart generation
    async fn generate_chart(&self, input: ChartInput) -> Result<AsyncQuery, AdaptorError>;

    async fn get_chart_result(&self, query_id: &str) -> Result<ChartResult, AdaptorError>;
}
