//! Netmon Cache - cache server binary
//!
//! Serves the tiered cache, rate limiter and device optimizer over HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netmon_cache::tasks::spawn_rate_limit_sweep;
use netmon_cache::{create_router, AppState, Config};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the tiered cache, rate limiter and device manager
/// 4. Start the rate-limit sweep and optimizer maintenance tasks
/// 5. Serve the router on the configured port
/// 6. On SIGINT/SIGTERM, stop accepting requests and tear everything down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netmon_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Netmon Cache Server");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        l1_ttl = config.l1.default_ttl,
        l1_max_memory_mb = config.l1.max_memory_mb,
        l2_enabled = config.l2.is_some(),
        rate_limit = config.rate_limit_requests,
        rate_limit_window_ms = config.rate_limit_window_ms,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config).context("invalid configuration")?;

    let sweep_handle = spawn_rate_limit_sweep(
        state.limiter.clone(),
        Duration::from_millis(config.rate_limit_sweep_ms),
    );
    state.devices.start_maintenance().await;
    info!("Background tasks started");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweep_handle.abort();
    state.devices.shutdown().await;
    state.cache.destroy().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
