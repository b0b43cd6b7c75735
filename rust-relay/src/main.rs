//! Callhook Relay - Zoom Phone webhook receiver.
//!
//! This binary:
//! - Verifies Zoom webhook signatures
//! - Answers URL validation challenges
//! - Acknowledges call events and forwards connect/disconnect to Serviceware
//!
//! Forwarding is best effort: one attempt, failures are logged only.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;

use callhook::{logging, web, AppState, Config, Forwarder};

/// How long shutdown waits for in-flight Serviceware forwards.
const FORWARD_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    let _log_guards = logging::init(&config);

    info!("relay_starting");
    info!(
        port = config.port,
        webhook_path = %config.webhook_path,
        serviceware_api_url = %config.serviceware_api_url,
        distinct_verification_token = config.has_distinct_verification_token(),
        forward_timeout_ms = config.forward_timeout_ms,
        rate_limit_per_minute = config.rate_limit_per_minute,
        log_dir = %config.log_dir,
        "config_loaded"
    );

    let forwarder = Forwarder::new(&config).context("Failed to create Serviceware forwarder")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = web::router(AppState::new(config, forwarder.clone()));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Forwards already acknowledged to Zoom get a short grace period.
    if forwarder.drain(FORWARD_DRAIN_TIMEOUT).await {
        info!("serviceware_forwards_drained");
    }

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
