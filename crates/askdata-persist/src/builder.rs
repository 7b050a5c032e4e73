use crate::dbs::sqlite::SqliteStore;
use crate::error::{PersistError, Result};

pub struct StoreBuilder {
    database_url: Option<String>,
    max_connections: u32,
    run_migrations: bool,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            run_migrations: true,
        }
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub async fn build(self) -> Result<SqliteStore> {
        let url = self
            .database_url
            .ok_or_else(|| PersistError::Internal("database_url is required".to_string()))?;

        let store = SqliteStore::connect(&url, self.max_connections).await?;
        if self.run_migrations {
            store.migrate().await?;
        }
        Ok(store)
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
