//! WA Relay - receives WhatsApp Cloud API webhooks and relays them to Salesforce.
//!
//! This binary provides a thin web server that:
//! - Answers the platform's subscription handshake
//! - Acknowledges every message immediately
//! - Relays payloads to the Apex REST endpoint in the background
//!
//! On shutdown it stops accepting requests and waits for in-flight relays.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wa_relay::{router, AppState, Config, Forwarder, Relay, TokenProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        port = config.port,
        auth_flow = config.auth.flow().as_str(),
        token_url = %config.token_url,
        instance_url = ?config.instance_url.as_ref().map(|u| u.as_str()),
        verify_token_configured = config.verify_token.is_some(),
        forward_concurrency = config.forward_concurrency,
        http_timeout_ms = config.http_timeout.as_millis() as u64,
        "config_loaded"
    );

    if config.verify_token.is_none() {
        warn!("verify_token_not_configured_handshakes_will_fail");
    }

    // One pooled client for both the token endpoint and Apex
    let client = Client::builder()
        .timeout(config.http_timeout)
        .user_agent(concat!("wa-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let tokens = TokenProvider::from_config(&config, client.clone())
        .context("Failed to initialise token provider")?;
    let forwarder = Forwarder::new(client, config.instance_url.clone());
    let relay = Relay::new(tokens, forwarder, config.forward_concurrency);

    info!(strategy = config.auth.flow().as_str(), "relay_created");

    // Create application state
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, relay.clone());
    let app = router(state);

    // Bind to address
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Let detached relays finish before exiting
    relay.shutdown().await;

    info!("web_server_shutdown_complete");

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

    info!("web_server_shutting_down");
}
