use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Json` whose rejections use the API error envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with Content-Type: application/json".to_string()
            }
            JsonRejection::JsonSyntaxError(e) => format!("Invalid JSON body: {}", e.body_text()),
            JsonRejection::JsonDataError(e) => format!("Invalid request body: {}", e.body_text()),
            other => other.body_text(),
        };
        ApiError::BadRequest(message)
    }
}
