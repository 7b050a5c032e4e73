use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A connected data source together with its display settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub display_name: String,
    /// Engine data source kind, e.g. `duckdb` or `postgres`
    pub data_source: String,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub display_name: String,
    pub data_source: String,
    pub language: Option<String>,
}

/// A deployed semantic model; the newest one of the current project is what
/// questions are asked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: i64,
    pub project_id: i64,
    pub hash: String,
    pub manifest: serde_json::Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
