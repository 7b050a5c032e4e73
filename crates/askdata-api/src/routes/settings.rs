use askdata_types::ConfigResponse;
use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::state::AppState;

/// Client-side settings
///
/// The telemetry key is base64 encoded so it is not shipped as a plain
/// string; it is empty when no key is configured.
#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Client configuration", body = ConfigResponse)
    ),
    tag = "config"
)]
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    let key = &state.config.posthog_api_key;
    let telemetry_key = if key.is_empty() {
        String::new()
    } else {
        STANDARD.encode(key)
    };

    Json(ConfigResponse {
        is_telemetry_enabled: state.config.telemetry.enabled,
        telemetry_key,
        telemetry_host: state.config.telemetry.posthog_host.clone(),
        user_uuid: state.config.telemetry.user_uuid.clone(),
    })
}
