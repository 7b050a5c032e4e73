use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(i64),

    #[error("Response not found: {0}")]
    ResponseNotFound(i64),

    #[error("Project not found: {0}")]
    ProjectNotFound(i64),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;
