use askdata_persist::PersistError;
use askdata_types::{ErrorBody, ErrorCode};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("No deployment found, please deploy a model first")]
    NoDeployment,

    /// The question is not answerable with SQL; an explanation is streamed instead
    #[error("{message}")]
    NonSqlQuery {
        message: String,
        explanation_query_id: String,
    },

    /// Generation task reported a failure of its own
    #[error("{message}")]
    AiTask {
        code: String,
        message: String,
        invalid_sql: Option<String>,
    },

    #[error("{message}")]
    InvalidSql { message: String, sql: String },

    #[error("{0}")]
    PollingTimeout(String),

    /// Upstream service failed or answered something unusable
    #[error("{0}")]
    Upstream(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::NoDeployment
            | ApiError::NonSqlQuery { .. }
            | ApiError::AiTask { .. }
            | ApiError::InvalidSql { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Persist(PersistError::ThreadNotFound(_))
            | ApiError::Persist(PersistError::ResponseNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::PollingTimeout(_)
            | ApiError::Upstream(_)
            | ApiError::Persist(_)
            | ApiError::RequestTimeout
            | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire body; internal details of storage failures are not exposed
    pub fn body(&self) -> ErrorBody {
        let mut body = ErrorBody {
            error: self.to_string(),
            ..Default::default()
        };

        match self {
            ApiError::BadRequest(_) | ApiError::NotFound(_) => {}
            ApiError::NoDeployment => {
                body.code = Some(ErrorCode::NoDeploymentFound.to_string());
            }
            ApiError::NonSqlQuery {
                explanation_query_id,
                ..
            } => {
                body.code = Some(ErrorCode::NonSqlQuery.to_string());
                body.explanation_query_id = Some(explanation_query_id.clone());
            }
            ApiError::AiTask {
                code, invalid_sql, ..
            } => {
                body.code = Some(code.clone());
                body.invalid_sql = invalid_sql.clone();
            }
            ApiError::InvalidSql { sql, .. } => {
                body.code = Some(ErrorCode::InvalidSqlError.to_string());
                body.invalid_sql = Some(sql.clone());
            }
            ApiError::PollingTimeout(_) => {
                body.code = Some(ErrorCode::PollingTimeout.to_string());
            }
            ApiError::Upstream(_) => {
                body.code = Some(ErrorCode::InternalServerError.to_string());
            }
            ApiError::Persist(PersistError::ThreadNotFound(_)) => {
                body.error = "Thread not found".to_string();
            }
            ApiError::Persist(PersistError::ResponseNotFound(_)) => {
                body.error = "Response not found".to_string();
            }
            ApiError::Persist(_) => {
                body.error = "Storage error".to_string();
                body.code = Some(ErrorCode::InternalServerError.to_string());
            }
            ApiError::RequestTimeout | ApiError::Internal => {
                body.code = Some(ErrorCode::InternalServerError.to_string());
            }
        }

        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Persist(e) if status.is_server_error() => {
                tracing::error!("Persistence error: {}", e);
            }
            ApiError::PollingTimeout(msg) => tracing::warn!("Polling timeout: {}", msg),
            ApiError::Upstream(msg) => tracing::error!("Upstream error: {}", msg),
            ApiError::RequestTimeout => tracing::warn!("Request timed out"),
            ApiError::Internal => tracing::error!("Internal error"),
            _ => {}
        }

        (status, Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
