use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{http::header, web, App, HttpServer};
use bingo_server::config::CorsConfig;
use bingo_server::{configure, AppError, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // Same-origin only
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_any_header()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .supports_credentials()
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> bingo_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!(
        "Configuration loaded for environment {} ({:?} storage)",
        config.environment, config.database.backend
    );

    let state = AppState::new(config.clone()).await?;

    // Expired sessions and idle rate-limit windows
    let cleanup = state.spawn_cleanup(Duration::from_secs(60));

    let listener = TcpListener::bind(config.bind_address())?;
    info!("Starting server at {}", config.bind_address());

    let data = web::Data::new(state.clone());
    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(cors(&cors_config))
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(configure)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    cleanup.abort();
    state.shutdown().await?;
    info!("Server stopped");

    Ok(())
}
