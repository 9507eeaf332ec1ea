//! Web server: Axum router exposing the odds comparison.
//!
//! Serves a JSON API and a self-contained HTML page.
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::ServerConfig;
pub use routes::{AppState, ServerState};

/// The embedded comparison page (compiled into the binary).
const INDEX_HTML: &str = include_str!("templates/index.html");

/// Bind `config.host:config.port` and serve until Ctrl+C.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr().context("Failed to read bound address")?;
    info!(%addr, "ODDSCOPE listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/compare", post(routes::compare))
        .route("/api/bookmakers", get(routes::bookmakers))
        .route("/api/fixtures", get(routes::fixtures))
        .route("/health", get(routes::health))
        .route("/", get(serve_index))
        .layer(cors)
        .with_state(state)
}

async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
