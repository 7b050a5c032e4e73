mod api_history;
mod project;
mod thread;

pub use api_history::ApiHistoryRepository;
pub use project::ProjectRepository;
pub use thread::ThreadRepository;

use crate::error::Result;

/// Decode an optional JSON text column
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Result<Option<T>> {
    match raw {
        Some(text) if !text.is_empty() => Ok(Some(serde_json::from_str(&text)?)),
        _ => Ok(None),
    }
}

pub(crate) fn to_json_text<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value.map(serde_json::to_string).transpose().map_err(Into::into)
}
