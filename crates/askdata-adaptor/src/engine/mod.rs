mod client;

pub use client::HttpQueryEngine;

use askdata_types::ColumnInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AdaptorError;

/// SQL plus the deployed model it is evaluated against
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineQuery<'a> {
    pub sql: &'a str,
    pub manifest: &'a Value,
    pub data_source: &'a str,
}

/// Column-oriented preview result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Rows keyed by column name
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.data
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, value)| (col.name.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }

    /// Payload shape the AI service expects as `sql_data`
    pub fn to_sql_data(&self) -> Value {
        serde_json::json!({
            "columns": self.columns,
            "data": self.data,
        })
    }
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Execute `sql` and return at most `limit` rows
    async fn preview(&self, query: EngineQuery<'_>, limit: u32) -> Result<QueryResult, AdaptorError>;

    /// Translate canonical SQL into the data source's native dialect
    async fn native_sql(&self, query: EngineQuery<'_>) -> Result<String, AdaptorError>;
}
