//! HTTP gateway implementation using Axum.

use crate::handler::{handle_health, handle_rpc};
use axum::{
    routing::{get, post},
    Router,
};
use stackcalc_core::{CalculatorService, ServiceConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// The same service instance the TCP transport publishes
    pub service: Arc<CalculatorService>,
}

/// Build the gateway router.
pub fn router(service: Arc<CalculatorService>) -> Router {
    let state = Arc::new(AppState { service });

    // Configure CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(ConcurrencyLimitLayer::new(ServiceConfig::MAX_IPC_CONNECTIONS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    service: Arc<CalculatorService>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP gateway listening on {}", actual_addr);

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP gateway error: {}", e);
        }
    });

    Ok(actual_addr)
}
