// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runlog API Server
//!
//! Records runs for signed-in users in Firestore and for guests in local
//! storage, and serves the run list and profile aggregates.

use runlog::{
    config::Config,
    db::{FirestoreDb, LocalStorage},
    services::session::spawn_expiry_sweeper,
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired signed-in sessions are torn down.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Runlog API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Open on-device guest storage
    let storage =
        LocalStorage::open(&config.local_storage_dir).expect("Failed to open local storage");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, storage));

    // Drop sessions whose tokens have expired
    let sweeper = spawn_expiry_sweeper(state.sessions.clone(), SESSION_SWEEP_INTERVAL);

    // Build router
    let app = runlog::routes::create_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;
    sweeper.abort();
    Ok(())
}

/// Wait for Ctrl-C, then end every session so open run streams close.
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!(sessions = state.sessions.len(), "Shutting down");
    state.sessions.sign_out_all();
    state.guest.sign_out();
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("runlog=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
