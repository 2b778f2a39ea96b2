//! Dashboard — Axum web server exposing the control surface.
//!
//! Serves the start/stop/reset API and a self-contained HTML page with
//! live stats and the balance chart. CORS enabled for local development.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::engine::ControllerHandle;

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Start the dashboard web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_dashboard(handle: ControllerHandle, port: u16) -> Result<()> {
    let app = build_router(handle);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Dashboard server starting on http://localhost:{port}");

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "Dashboard server error");
                }
            }
            Err(e) => tracing::error!(error = %e, port, "Failed to bind dashboard port"),
        }
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(handle: ControllerHandle) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // API routes
        .route("/api/status", get(routes::get_status))
        .route("/api/balance-history", get(routes::get_balance_history))
        .route("/api/start", post(routes::start))
        .route("/api/stop", post(routes::stop))
        .route("/api/reset", post(routes::reset))
        .route("/api/clear-history", post(routes::clear_history))
        .route("/health", get(routes::health))
        // Dashboard HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(handle)
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
