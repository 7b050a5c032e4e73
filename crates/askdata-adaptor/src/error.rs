use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdaptorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from an upstream service
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl AdaptorError {
    /// Message suitable for forwarding verbatim to API callers
    pub fn message(&self) -> String {
        match self {
            AdaptorError::Upstream { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AdaptorError::Upstream { status, .. } => Some(*status),
            AdaptorError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Pull a human readable message out of an upstream error body.
///
/// Services answer with `{"message": ..}`, `{"error": ..}` or
/// `{"detail": ..}`; anything else is returned as raw text.
pub(crate) fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "detail"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(serde_json::Value::Object(inner)) => {
                    if let Some(serde_json::Value::String(s)) = inner.get("message") {
                        return s.clone();
                    }
                }
                _ => {}
            }
        }
    }
    body.trim().to_string()
}
