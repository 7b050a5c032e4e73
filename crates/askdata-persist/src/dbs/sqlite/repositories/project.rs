use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::{PersistError, Result};
use crate::models::{Deployment, NewProject, Project};

#[derive(Clone)]
pub struct ProjectRepository {
    pool: SqlitePool,
}

impl ProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn current_project(&self) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, display_name, data_source, language, created_at FROM project ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| project_from_row(&r)).transpose()
    }

    pub async fn create_project(&self, project: NewProject) -> Result<Project> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO project (display_name, data_source, language, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&project.display_name)
        .bind(&project.data_source)
        .bind(&project.language)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Project {
            id: result.last_insert_rowid(),
            display_name: project.display_name,
            data_source: project.data_source,
            language: project.language,
            created_at: now,
        })
    }

    /// Newest deployment of the project
    pub async fn last_deployment(&self, project_id: i64) -> Result<Option<Deployment>> {
        let row = sqlx::query(
            "SELECT id, project_id, hash, manifest, status, created_at FROM deploy_log WHERE project_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| deployment_from_row(&r)).transpose()
    }

    pub async fn find_deployment(&self, project_id: i64, hash: &str) -> Result<Option<Deployment>> {
        let row = sqlx::query(
            "SELECT id, project_id, hash, manifest, status, created_at FROM deploy_log WHERE project_id = ? AND hash = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(project_id)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| deployment_from_row(&r)).transpose()
    }

    pub async fn record_deployment(
        &self,
        project_id: i64,
        hash: &str,
        manifest: &serde_json::Value,
    ) -> Result<Deployment> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM project WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(PersistError::ProjectNotFound(project_id));
        }

        let now = Utc::now();
        let status = "SUCCESS";
        let result = sqlx::query(
            "INSERT INTO deploy_log (project_id, hash, manifest, status, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(hash)
        .bind(serde_json::to_string(manifest)?)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Deployment {
            id: result.last_insert_rowid(),
            project_id,
            hash: hash.to_string(),
            manifest: manifest.clone(),
            status: status.to_string(),
            created_at: now,
        })
    }
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    Ok(Project {
        id: row.try_get("id")?,
        display_name: row.try_get("display_name")?,
        data_source: row.try_get("data_source")?,
        language: row.try_get("language")?,
        created_at: row.try_get("created_at")?,
    })
}

fn deployment_from_row(row: &SqliteRow) -> Result<Deployment> {
    let manifest: String = row.try_get("manifest")?;
    Ok(Deployment {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        hash: row.try_get("hash")?,
        manifest: serde_json::from_str(&manifest)?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}
