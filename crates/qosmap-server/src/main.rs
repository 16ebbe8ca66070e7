//! QoS map server - backend for the network-quality monitoring dashboard.

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qosmap_server::config::Config;
use qosmap_server::state::AppState;
use qosmap_server::{api, loops, persistence};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qosmap_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting qosmap server...");

    let config = Config::from_env();
    let port = config.server_port;
    let db =
        persistence::init_database(&config.database_path, config.database_max_connections).await?;
    let state = Arc::new(AppState::new(db, config));

    // Background cloud sync; a no-op when no cloud URL is configured.
    tokio::spawn(loops::cloud_sync_loop::run_cloud_sync_loop(state.clone()));

    // Build the app
    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
