//! Callhook Mock Downstream - local Serviceware stand-in.
//!
//! Accepts the connect/disconnect hooks the relay posts to, checks the bearer
//! secret and logs what arrived. Listens on `MOCK_DOWNSTREAM_PORT` (4000).

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use callhook::{mock, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    let config = Config::from_env();
    let port: u16 = env::var("MOCK_DOWNSTREAM_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4000);

    info!(
        port = port,
        connect_endpoint = %config.connect_endpoint,
        disconnect_endpoint = %config.disconnect_endpoint,
        "mock_downstream_starting"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "mock_downstream_listening");

    axum::serve(listener, mock::router(&config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    Ok(())
}
