pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod install;
pub mod populate;
pub mod search;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpResponse};
use tracing::{error, info};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, RateLimitConfig, RateLimiter};
pub use db::{BingoStore, MemoryStore, PgStore};

use config::StoreBackend;

/// Health check endpoint handler
/// Returns a JSON response with server status, timestamp and storage backend
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let mut body = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "backend": state.config.database.backend,
    });
    if let Some(pg) = &state.postgres {
        let pool = pg.pool_status();
        body["database"] = serde_json::json!({
            "total_connections": pool.total_connections,
            "active_connections": pool.active_connections,
            "idle_connections": pool.idle_connections,
        });
    }
    HttpResponse::Ok().json(body)
}

/// Registers every route of the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        AppError::ValidationError(err.to_string()).into()
    }))
    .route("/health", web::get().to(health_check))
    .configure(auth::handlers::configure)
    .configure(api::configure)
    .configure(search::configure);
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub store: Arc<dyn BingoStore>,
    pub auth_service: Arc<AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Set when running on Postgres, for pool statistics and shutdown.
    pub postgres: Option<Arc<PgStore>>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        match config.database.backend {
            StoreBackend::Postgres => {
                let pg = Arc::new(PgStore::connect(&config.database).await?);
                info!("Connected to Postgres");
                let mut state = Self::with_store(config, pg.clone());
                state.postgres = Some(pg);
                Ok(state)
            }
            StoreBackend::Memory => {
                info!("Using in-memory storage; data is lost on shutdown");
                Ok(Self::with_store(config, Arc::new(MemoryStore::new())))
            }
        }
    }

    pub fn with_store(config: Settings, store: Arc<dyn BingoStore>) -> Self {
        let auth_service = AuthService::from_config(store.clone(), &config.auth);
        let rate_limiter = RateLimiter::new(RateLimitConfig {
            window_size: chrono::Duration::minutes(1),
            max_requests: config.auth.login_attempts_per_minute,
        });

        Self {
            config: Arc::new(config),
            store,
            auth_service: Arc::new(auth_service),
            rate_limiter: Arc::new(rate_limiter),
            postgres: None,
        }
    }

    /// Prunes idle rate-limit windows and expired sessions.
    pub async fn cleanup(&self) -> Result<()> {
        let windows = self.rate_limiter.cleanup().await;
        let sessions = self.store.cleanup_expired_sessions().await?;
        if windows > 0 || sessions > 0 {
            info!(
                "Cleanup removed {} rate-limit windows and {} expired sessions",
                windows, sessions
            );
        }
        Ok(())
    }

    /// Runs `cleanup` every `period` until the task is dropped.
    pub fn spawn_cleanup(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if let Err(e) = state.cleanup().await {
                    error!("Periodic cleanup failed: {}", e);
                }
            }
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(pg) = &self.postgres {
            pg.close().await;
        }
        Ok(())
    }
}
