mod api_history;
mod project;

pub use api_history::{ApiHistoryRecord, ApiType, NewApiHistory};
pub use project::{Deployment, NewProject, Project};
