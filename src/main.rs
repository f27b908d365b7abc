//! Cache Aside admin server
//!
//! Runs the cache manager with its background tasks behind the admin API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_aside::{create_router, spawn_sweep_task, AppState, Config, Manager};

/// Main entry point for the admin server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the manager and check the backend answers
/// 4. Start the sweeper (when enabled)
/// 5. Serve the admin router until SIGINT/SIGTERM
/// 6. Stop background tasks and close the backend
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_aside=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache-aside server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={}, default_ttl={}s, port={}, sweep_interval={}s",
        config.backend, config.default_ttl, config.server_port, config.sweep_interval
    );

    let manager = Arc::new(
        Manager::from_config(&config)
            .await
            .context("failed to initialize cache manager")?,
    );

    let mut tasks = Vec::new();
    if config.sweep_interval > 0 {
        tasks.push(spawn_sweep_task(
            manager.clone(),
            Duration::from_secs(config.sweep_interval),
        ));
        info!("Background sweep task started");
    }

    let app = create_router(AppState::new(manager.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    for task in tasks {
        task.abort();
    }
    if let Err(e) = manager.close().await {
        warn!(error = %e, "backend did not close cleanly");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
