//! Gamemaster API server entry point.

use std::error::Error;
use std::sync::{Arc, Mutex};

use gamemaster_actions::application::engine::{ActionEngine, EngineDeps};
use gamemaster_api::config::AppConfig;
use gamemaster_api::error::AppError;
use gamemaster_api::gateway::ChannelPublisher;
use gamemaster_api::state::AppState;
use gamemaster_api::{app, telemetry};
use gamemaster_core::clock::SystemClock;
use gamemaster_core::rng::SystemRng;
use gamemaster_narrator::HttpNarrator;
use gamemaster_state_store::{PgCampaignDirectory, PgStateStore};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otel_endpoint.as_deref())?;

    tracing::info!("Starting Gamemaster API server");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(AppError::from)?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(AppError::from)?;

    let gateway = ChannelPublisher::new(config.broadcast_capacity);
    let narrator = HttpNarrator::new(&config.narrator)
        .map_err(|e| AppError::Config(format!("narrator client: {e}")))?;
    let engine = ActionEngine::start(EngineDeps {
        store: Arc::new(PgStateStore::new(pool.clone())),
        directory: Arc::new(PgCampaignDirectory::new(pool)),
        narrator: Arc::new(narrator),
        publisher: Arc::new(gateway.clone()),
        clock: Arc::new(SystemClock),
        rng: Arc::new(Mutex::new(SystemRng::from_entropy())),
    });
    engine
        .recover_pending()
        .await
        .map_err(|e| AppError::Recovery(e.to_string()))?;

    let router = app(AppState::new(engine.clone(), gateway));

    tracing::info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(AppError::from)?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::from)?;

    engine.shutdown();
    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
}
