use askdata_adaptor::TaskPoller;
use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "ServiceConfig::default_ai")]
    pub ai: ServiceConfig,
    #[serde(default = "ServiceConfig::default_engine")]
    pub engine: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub ask: AskConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub project: ProjectConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub posthog_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on the time until response headers are sent.
    /// A streamed body (the SSE relays) is not bounded once it has started.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://askdata.sqlite3?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl ServiceConfig {
    fn default_ai() -> Self {
        Self {
            endpoint: "http://localhost:5555".to_string(),
            timeout_secs: 30,
        }
    }

    fn default_engine() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            timeout_secs: 60,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Deadline for a generation task to reach a terminal state
    pub max_wait_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            max_wait_ms: 60_000,
        }
    }
}

impl PollingConfig {
    pub fn poller(&self) -> TaskPoller {
        TaskPoller::new(
            Duration::from_millis(self.interval_ms),
            Duration::from_millis(self.max_wait_ms),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskConfig {
    pub default_language: String,
    /// Rows previewed for summaries and charts when the caller gives no size
    pub sample_size: u32,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            default_language: "English".to_string(),
            sample_size: askdata_types::DEFAULT_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub posthog_host: String,
    #[serde(default)]
    pub user_uuid: String,
}

/// Project registered at startup when a manifest is configured
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    pub display_name: String,
    pub data_source: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Deployed semantic model; nothing is registered when unset
    #[serde(default)]
    pub manifest_path: Option<String>,
    /// Hash the AI service knows the model by; derived from the manifest when unset
    #[serde(default)]
    pub deploy_hash: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            display_name: "default".to_string(),
            data_source: "duckdb".to_string(),
            language: None,
            manifest_path: None,
            deploy_hash: None,
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables, `ASKDATA_` prefixed with `__` between
    ///    section and key (e.g. `ASKDATA_SERVER__PORT=8080`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything
            .add_source(
                Environment::with_prefix("ASKDATA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Load secrets from ENV (not in TOML)
        cfg.posthog_api_key = std::env::var("POSTHOG_API_KEY").unwrap_or_default();

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            database: DatabaseConfig::default(),
            ai: ServiceConfig::default_ai(),
            engine: ServiceConfig::default_engine(),
            polling: PollingConfig::default(),
            ask: AskConfig::default(),
            logging: LoggingConfig::default(),
            telemetry: TelemetryConfig::default(),
            project: ProjectConfig::default(),
            posthog_api_key: String::new(),
        }
    }
}
