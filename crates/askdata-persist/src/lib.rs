pub mod builder;
pub mod dbs;
pub mod error;
pub mod models;
pub mod store;

pub use askdata_types::{AnswerDetail, AnswerStatus, ChartDetail, Thread, ThreadDetail, ThreadResponse};
pub use builder::StoreBuilder;
pub use dbs::sqlite::SqliteStore;
pub use error::{PersistError, Result};
pub use models::{ApiHistoryRecord, ApiType, Deployment, NewApiHistory, NewProject, Project};
pub use store::ThreadStore;
