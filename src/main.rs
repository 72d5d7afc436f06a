use tx_index_service::{
    api,
    config::Config,
    db,
    jobs::worker::WorkerPool,
    state::AppState,
};

use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Helper function for shutdown signal handling
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tx-index-service");

    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let db_pool = db::connection::establish_connection(&config.database_url).await?;
    db::migration::run_migrations(&db_pool).await?;
    info!("Database ready");

    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    let app_state = Arc::new(AppState::new(config, db_pool)?);

    let shutdown = CancellationToken::new();

    let worker_pool = WorkerPool::new(app_state.clone(), shutdown.clone());
    info!(
        "Gap worker pool started with {} workers",
        app_state.config.worker_concurrency
    );

    let app = api::create_router(app_state);
    let addr = format!("{server_host}:{server_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    let server_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_shutdown.cancelled().await;
            })
            .await
            .expect("Server error");
    });

    shutdown_signal().await;

    // Drain: stop accepting requests, let workers finish their in-flight
    // jobs, then exit. Further signals during draining are ignored.
    info!("Initiating graceful shutdown");
    shutdown.cancel();

    let shutdown_timeout = tokio::time::Duration::from_secs(30);

    tokio::select! {
        _ = tokio::time::sleep(shutdown_timeout) => {
            warn!("Server shutdown timed out after {:?}, forcing exit", shutdown_timeout);
        }
        _ = server_handle => {
            info!("HTTP server shut down");
        }
    }

    tokio::select! {
        _ = tokio::time::sleep(shutdown_timeout) => {
            warn!("Worker drain timed out after {:?}, forcing exit", shutdown_timeout);
        }
        _ = worker_pool.join() => {
            info!("Gap workers drained");
        }
    }

    info!("All components shut down, exiting");
    Ok(())
}
