use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation: an ordered list of question/answer responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: i64,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Thread together with its responses, ordered by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ThreadDetail {
    #[serde(flatten)]
    pub thread: Thread,
    pub responses: Vec<ThreadResponse>,
}

/// One question asked within a thread and what came back for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ThreadResponse {
    pub id: i64,
    pub thread_id: i64,
    pub question: String,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub answer_detail: Option<AnswerDetail>,
    #[serde(default)]
    pub chart_detail: Option<ChartDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerStatus {
    NotStarted,
    FetchingData,
    Preprocessing,
    Streaming,
    Finished,
    Failed,
    Interrupted,
}

impl Default for AnswerStatus {
    fn default() -> Self {
        AnswerStatus::Finished
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub status: AnswerStatus,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ChartDetail {
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub chart_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}
