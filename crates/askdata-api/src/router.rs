use axum::{
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    error::ApiError,
    handlers::stream,
    middleware::logging,
    openapi,
    routes::{ask, chart, health, settings, summary, threads},
    state::AppState,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Ask pipeline
        .route("/api/v1/generate_sql", post(ask::generate_sql))
        .route("/api/v1/run_sql", post(ask::run_sql))
        .route("/api/v1/generate_summary", post(summary::generate_summary))
        .route("/api/v1/generate_vega_chart", post(chart::generate_vega_chart))
        // Streams
        .route("/api/v1/stream_summary", get(stream::stream_summary))
        .route("/api/v1/stream_explanation", get(stream::stream_explanation))
        // Threads
        .route(
            "/api/v1/threads",
            get(threads::list_threads).post(threads::create_thread),
        )
        .route("/api/v1/threads/:thread_id", get(threads::get_thread))
        .route(
            "/api/v1/threads/:thread_id/responses",
            get(threads::list_responses).post(threads::create_response),
        )
        .route(
            "/api/v1/threads/:thread_id/responses/:response_id/sql",
            post(threads::update_response_sql),
        )
        .route(
            "/api/v1/threads/:thread_id/responses/:response_id/answer",
            post(threads::update_response_answer),
        )
        // Settings, health and docs
        .route("/api/config", get(settings::get_config))
        .route("/health", get(health::health_check))
        .route("/api/openapi.json", get(openapi::openapi_json));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(api_routes)
        .layer(middleware::from_fn(logging::log_request))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(timeout),
        )
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::RequestTimeout
    } else {
        tracing::error!("Middleware error: {}", err);
        ApiError::Internal
    }
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if !config.cors.enabled {
        return CorsLayer::new();
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors.origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors
            .origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        cors.allow_origin(origins)
    }
}
