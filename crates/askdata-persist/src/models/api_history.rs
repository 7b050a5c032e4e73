use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiType {
    GenerateSql,
    RunSql,
    GenerateSummary,
    GenerateVegaChart,
    StreamSummary,
    StreamExplanation,
}

impl ApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::GenerateSql => "GENERATE_SQL",
            ApiType::RunSql => "RUN_SQL",
            ApiType::GenerateSummary => "GENERATE_SUMMARY",
            ApiType::GenerateVegaChart => "GENERATE_VEGA_CHART",
            ApiType::StreamSummary => "STREAM_SUMMARY",
            ApiType::StreamExplanation => "STREAM_EXPLANATION",
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERATE_SQL" => Ok(ApiType::GenerateSql),
            "RUN_SQL" => Ok(ApiType::RunSql),
            "GENERATE_SUMMARY" => Ok(ApiType::GenerateSummary),
            "GENERATE_VEGA_CHART" => Ok(ApiType::GenerateVegaChart),
            "STREAM_SUMMARY" => Ok(ApiType::StreamSummary),
            "STREAM_EXPLANATION" => Ok(ApiType::StreamExplanation),
            other => Err(format!("unknown api type: {}", other)),
        }
    }
}

/// One recorded call of the public ask API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiHistoryRecord {
    pub id: i64,
    pub project_id: Option<i64>,
    pub api_type: ApiType,
    pub thread_id: Option<String>,
    pub headers: Option<Value>,
    pub request_payload: Option<Value>,
    pub response_payload: Option<Value>,
    pub status_code: u16,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApiHistory {
    pub project_id: Option<i64>,
    pub api_type: ApiType,
    pub thread_id: Option<String>,
    pub headers: Option<Value>,
    pub request_payload: Option<Value>,
    pub response_payload: Option<Value>,
    pub status_code: u16,
    pub duration_ms: u64,
}
