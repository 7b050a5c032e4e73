use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use askdata_adaptor::{AnalyticsAi, HttpAnalyticsAi, HttpQueryEngine, QueryEngine};
use askdata_api::{build_router, config::Config, services::deployment, state::AppState};
use askdata_persist::{StoreBuilder, ThreadStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // ASKDATA_CONFIG points at a single file; otherwise the layered lookup
    let config = match std::env::var("ASKDATA_CONFIG") {
        Ok(path) => Config::from_file(&path),
        Err(_) => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting askdata API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    tracing::info!("Opening database {}", config.database.url);
    let store = StoreBuilder::new()
        .database_url(&config.database.url)
        .max_connections(config.database.max_connections)
        .build()
        .await
        .context("Failed to open database")?;
    let store: Arc<dyn ThreadStore> = Arc::new(store);

    match deployment::register_manifest(store.as_ref(), &config.project).await {
        Ok(Some(d)) => tracing::info!("Serving deployment {}", d.hash),
        Ok(None) => tracing::warn!("No manifest configured; ask endpoints need a deployment"),
        Err(e) => tracing::error!("Failed to register manifest: {:#}", e),
    }

    let ai: Arc<dyn AnalyticsAi> =
        Arc::new(HttpAnalyticsAi::new(&config.ai.endpoint, config.ai.timeout())?);
    let engine: Arc<dyn QueryEngine> = Arc::new(HttpQueryEngine::new(
        &config.engine.endpoint,
        config.engine.timeout(),
    )?);
    tracing::info!(
        "AI service: {}, query engine: {}",
        config.ai.endpoint,
        config.engine.endpoint
    );

    let state = Arc::new(AppState::new(config.clone(), store, ai, engine));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
