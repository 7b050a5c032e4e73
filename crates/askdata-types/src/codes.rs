use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error codes carried in the `code` field of error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoDeploymentFound,
    PollingTimeout,
    InvalidSqlError,
    NonSqlQuery,
    NoRelevantData,
    NoRelevantSql,
    Others,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoDeploymentFound => "NO_DEPLOYMENT_FOUND",
            ErrorCode::PollingTimeout => "POLLING_TIMEOUT",
            ErrorCode::InvalidSqlError => "INVALID_SQL_ERROR",
            ErrorCode::NonSqlQuery => "NON_SQL_QUERY",
            ErrorCode::NoRelevantData => "NO_RELEVANT_DATA",
            ErrorCode::NoRelevantSql => "NO_RELEVANT_SQL",
            ErrorCode::Others => "OTHERS",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Compare against a code received as a plain string
    pub fn matches(&self, code: Option<&str>) -> bool {
        code == Some(self.as_str())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
