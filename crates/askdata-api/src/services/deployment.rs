use anyhow::{Context, Result};
use askdata_persist::{Deployment, NewProject, Project, ThreadStore};
use sha2::{Digest, Sha256};

use crate::config::ProjectConfig;
use crate::error::{ApiError, ApiResult};

/// Current project and its newest deployment, or `NoDeployment`
pub async fn require_deployment(store: &dyn ThreadStore) -> ApiResult<(Project, Deployment)> {
    let project = store.current_project().await?.ok_or(ApiError::NoDeployment)?;
    let deployment = store
        .last_deployment(project.id)
        .await?
        .ok_or(ApiError::NoDeployment)?;
    Ok((project, deployment))
}

/// Stable hash of a manifest, used when none is configured
pub fn manifest_hash(manifest: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(manifest.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Register the configured manifest as the newest deployment.
///
/// Creates the project on first run. Returns `None` when no manifest is
/// configured. Registering the same hash twice is a no-op.
pub async fn register_manifest(
    store: &dyn ThreadStore,
    config: &ProjectConfig,
) -> Result<Option<Deployment>> {
    let Some(path) = config.manifest_path.as_deref() else {
        return Ok(None);
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read manifest {}", path))?;
    let manifest: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("Invalid manifest JSON in {}", path))?;

    let project = match store.current_project().await? {
        Some(project) => project,
        None => {
            tracing::info!("Creating project {}", config.display_name);
            store
                .create_project(NewProject {
                    display_name: config.display_name.clone(),
                    data_source: config.data_source.clone(),
                    language: config.language.clone(),
                })
                .await?
        }
    };

    let hash = config
        .deploy_hash
        .clone()
        .unwrap_or_else(|| manifest_hash(&manifest));

    // Only the newest deployment is served; an older row with the same hash
    // is re-recorded so it becomes the newest again
    if let Some(last) = store.last_deployment(project.id).await? {
        if last.hash == hash {
            tracing::info!("Deployment {} already registered", hash);
            return Ok(Some(last));
        }
    }

    let deployment = store.record_deployment(project.id, &hash, &manifest).await?;
    tracing::info!("Registered deployment {} for project {}", hash, project.id);
    Ok(Some(deployment))
}
