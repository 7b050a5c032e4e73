use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::poller::{TaskPhase, TaskState};

/// Handle of an asynchronous task created on the AI service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncQuery {
    #[serde(default)]
    pub query_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskHistory {
    pub question: String,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskConfigurations {
    pub language: String,
}

impl Default for AskConfigurations {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskInput {
    pub query: String,
    /// Hash of the deployed semantic model the question is asked against
    pub mdl_hash: String,
    #[serde(default)]
    pub histories: Vec<AskHistory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub configurations: AskConfigurations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AskStatus {
    Understanding,
    Searching,
    Planning,
    Generating,
    Correcting,
    Finished,
    Failed,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AskResultType {
    /// The question is not a data question; an explanation is streamed instead
    General,
    TextToSql,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskCandidate {
    pub sql: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<i64>,
}

/// Error reported by the AI service for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResult {
    pub status: AskStatus,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<AskResultType>,
    #[serde(default)]
    pub response: Vec<AskCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AiError>,
}

impl AskResult {
    /// SQL of the first candidate, if any non-blank one came back
    pub fn first_sql(&self) -> Option<&str> {
        self.response
            .first()
            .map(|c| c.sql.as_str())
            .filter(|sql| !sql.trim().is_empty())
    }
}

impl TaskState for AskResult {
    fn phase(&self) -> TaskPhase {
        match self.status {
            AskStatus::Understanding => TaskPhase::Pending,
            AskStatus::Searching
            | AskStatus::Planning
            | AskStatus::Generating
            | AskStatus::Correcting => TaskPhase::Running,
            AskStatus::Finished => TaskPhase::Succeeded,
            AskStatus::Failed | AskStatus::Stopped => TaskPhase::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBasedAnswerInput {
    pub query: String,
    pub sql: String,
    /// Preview rows the summary is written from
    pub sql_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub configurations: AskConfigurations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBasedAnswerStatus {
    Preprocessing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBasedAnswerResult {
    pub status: TextBasedAnswerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_rows_used_in_llm: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AiError>,
}

impl TaskState for TextBasedAnswerResult {
    fn phase(&self) -> TaskPhase {
        match self.status {
            TextBasedAnswerStatus::Preprocessing => TaskPhase::Running,
            TextBasedAnswerStatus::Succeeded => TaskPhase::Succeeded,
            TextBasedAnswerStatus::Failed => TaskPhase::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartInput {
    pub query: String,
    pub sql: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub configurations: AskConfigurations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartStatus {
    Fetching,
    Generating,
    Finished,
    Failed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartResponse {
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub chart_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartResult {
    pub status: ChartStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChartResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AiError>,
}

impl TaskState for ChartResult {
    fn phase(&self) -> TaskPhase {
        match self.status {
            ChartStatus::Fetching => TaskPhase::Pending,
            ChartStatus::Generating => TaskPhase::Running,
            ChartStatus::Finished => TaskPhase::Succeeded,
            ChartStatus::Failed | ChartStatus::Stopped => TaskPhase::Failed,
        }
    }
}
