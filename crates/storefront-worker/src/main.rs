//! Storefront notification worker entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use storefront_broker::pg_message_queue::PgMessageQueue;
use storefront_core::clock::SystemClock;
use storefront_notifications::application::consumer::OrderEventConsumer;
use storefront_notifications::channels::BroadcastHub;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use storefront_worker::config::WorkerConfig;
use storefront_worker::error::AppError;
use storefront_worker::routes;
use storefront_worker::runner::{self, RunnerSettings};
use storefront_worker::state::AppState;
use storefront_worker::wiring;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // A missing .env file is fine; real deployments set the environment.
    let _ = dotenvy::dotenv();

    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Storefront notification worker");

    let config = WorkerConfig::from_env()?;

    // Create database connection pool and bring the queue schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(u32::try_from(config.concurrency + 2).unwrap_or(u32::MAX))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let queue = Arc::new(PgMessageQueue::with_max_attempts(
        pool,
        config.max_delivery_attempts,
    ));

    // Build channels and the shared consumer.
    let hub = BroadcastHub::new();
    let mail = wiring::mail_transport(&config)?;
    let channels = wiring::build_channel_set(&config, &hub, Arc::new(SystemClock), mail)?;
    let consumer = OrderEventConsumer::new(channels);

    let shutdown = CancellationToken::new();
    let workers = runner::run_workers(
        queue,
        consumer,
        RunnerSettings::from(&config),
        &shutdown,
    );

    // Start server.
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = routes::build_router(AppState::new(hub, config.concurrency));

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    for result in futures::future::join_all(workers).await {
        if let Err(err) = result {
            tracing::error!(error = %err, "worker task failed");
        }
    }
    tracing::info!("Storefront notification worker stopped");

    Ok(())
}
