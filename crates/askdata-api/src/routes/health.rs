use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Returns the health status of the API and its dependencies
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut services = HashMap::new();

    let database = match state.store.health_check().await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            "disconnected"
        }
    };
    services.insert("database".to_string(), database.to_string());

    let deployment = match state.store.current_project().await {
        Ok(Some(project)) => match state.store.last_deployment(project.id).await {
            Ok(Some(d)) => d.hash,
            _ => "none".to_string(),
        },
        _ => "none".to_string(),
    };
    services.insert("deployment".to_string(), deployment);
    services.insert("ai".to_string(), state.config.ai.endpoint.clone());
    services.insert("engine".to_string(), state.config.engine.endpoint.clone());

    let status = if database == "connected" { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}
