use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: String,
    /// Overrides the password embedded in `url`; written to `.env` by the installer.
    pub password: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
    pub password_iterations: u32,
    pub login_attempts_per_minute: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub allowed_origins: Vec<String>,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    pub page_size: u32,
    pub recent_cards: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub max_results: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InstallConfig {
    pub secrets_dir: String,
    pub env_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub pagination: PaginationConfig,
    pub search: SearchConfig,
    pub install: InstallConfig,
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("environment", "development")?
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8000)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("database.backend", "postgres")?
        .set_default("database.url", "postgres://bingo@localhost/bingo")?
        .set_default("database.max_connections", 5)?
        .set_default("database.acquire_timeout_secs", 5)?
        .set_default("auth.jwt_secret", "development_secret")?
        .set_default("auth.token_expiry_hours", 24)?
        .set_default("auth.password_iterations", 100_000)?
        .set_default("auth.login_attempts_per_minute", 10)?
        .set_default("cors.enabled", true)?
        .set_default("cors.allow_any_origin", false)?
        .set_default(
            "cors.allowed_origins",
            vec!["http://localhost:8000", "http://127.0.0.1:8000"],
        )?
        .set_default("cors.max_age", 3600)?
        .set_default("pagination.page_size", 8)?
        .set_default("pagination.recent_cards", 5)?
        .set_default("search.max_results", 25)?
        .set_default("install.secrets_dir", "secrets")?
        .set_default("install.env_file", ".env")
}

fn environment_source() -> Environment {
    // E.g., `APP_SERVER__PORT=5001` sets `Settings.server.port`
    Environment::with_prefix("app")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors.allowed_origins")
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment_source())
            .build()?
            .try_deserialize()
    }

    /// In-memory storage and cheap password hashing; ignores config files
    /// and the environment so tests are reproducible.
    pub fn new_for_test() -> Result<Self, ConfigError> {
        with_defaults(Config::builder())?
            .set_override("environment", "test")?
            .set_override("server.workers", 1)?
            .set_override("database.backend", "memory")?
            .set_override("database.url", "postgres://bingo@localhost/bingo_test")?
            .set_override("database.max_connections", 2)?
            .set_override("auth.jwt_secret", "test_secret")?
            .set_override("auth.token_expiry_hours", 1)?
            .set_override("auth.password_iterations", 10)?
            .set_override("auth.login_attempts_per_minute", 1000)?
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
