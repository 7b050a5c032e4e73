use askdata_adaptor::AdaptorError;
use askdata_types::{ErrorBody, ErrorCode};
use thiserror::Error;

use crate::phase::AskPhase;

#[derive(Debug, Error)]
pub enum FlowError {
    /// Non-2xx answer from the askdata API
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
        invalid_sql: Option<String>,
        explanation_query_id: Option<String>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stream error: {0}")]
    Stream(#[from] AdaptorError),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("No SQL generated")]
    NoSql,

    #[error("A question is already being processed")]
    AlreadyProcessing,

    #[error("No message at index {0}")]
    MessageNotFound(usize),

    #[error("Cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: AskPhase, to: AskPhase },

    #[error("{0}")]
    InvalidInput(String),
}

impl FlowError {
    pub fn from_body(status: u16, body: ErrorBody) -> Self {
        FlowError::Api {
            status,
            message: body.error,
            code: body.code,
            invalid_sql: body.invalid_sql,
            explanation_query_id: body.explanation_query_id,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            FlowError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        code.matches(self.code())
    }

    pub fn invalid_sql(&self) -> Option<&str> {
        match self {
            FlowError::Api { invalid_sql, .. } => invalid_sql.as_deref(),
            _ => None,
        }
    }

    pub fn explanation_query_id(&self) -> Option<&str> {
        match self {
            FlowError::Api {
                explanation_query_id,
                ..
            } => explanation_query_id.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
