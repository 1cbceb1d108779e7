// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maraude-Map API Server
//!
//! Serves map display state for street-outreach associations and relays
//! activation toggles and live point updates to and from their backend.

use maraude_map::{config::Config, services::BackendClient, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Maraude-Map API");

    let backend = BackendClient::new(
        &config.backend_url,
        config.backend_api_token.clone(),
        Duration::from_secs(config.backend_timeout_secs),
    )?;
    tracing::info!(
        backend = %config.backend_url,
        cluster_radius_m = config.cluster_radius_m,
        default_days = config.default_days,
        "Association backend client initialized"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), backend));

    // Build router
    let app = maraude_map::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("maraude_map=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
