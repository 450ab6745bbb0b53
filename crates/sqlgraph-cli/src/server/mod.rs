//! HTTP server module for serve mode.
//!
//! Exposes the archive upload endpoint and a couple of introspection routes.
//! Requests are stateless: extract, infer, respond, discard.

pub mod api;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

pub use state::{AppState, ServerConfig};

/// Run the HTTP server. Blocks until shut down (e.g. via Ctrl+C).
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let port = config.port;
    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

/// Build the main router with CORS and body-size limits applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring unparsable origin: {origin}");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    // Reject oversized uploads at the transport layer; multipart framing
    // overhead gets a fixed allowance on top of the archive cap.
    let body_limit =
        RequestBodyLimitLayer::new(state.config.limits.max_archive_bytes as usize + 64 * 1024);

    Router::new()
        .nest("/api", api::api_routes())
        .with_state(state)
        .layer(cors)
        .layer(body_limit)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to install Ctrl+C handler: {e}");
    }
}
