/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::ledger::ActivityLedger;

pub fn create_router(ledger: Arc<ActivityLedger>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Insight endpoints
        .route("/api/addrs/txs", post(post_addrs_txs))
        .route("/api/addrs/:addrs/txs", get(get_addrs_txs))

        // Mock control endpoints
        .route("/mock/activity", post(set_activity))
        .route("/mock/mode", post(set_mode))
        .route("/mock/requests", get(request_stats))

        // Shared state
        .with_state(ledger)

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(
    ledger: Arc<ActivityLedger>,
    host: String,
    port: u16,
) -> anyhow::Result<()> {
    let app = create_router(ledger);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("🚀 Insight mock server listening on http://{}", addr);
    log::info!("🔨 Activity control endpoint: POST /mock/activity");

    axum::serve(listener, app)
        .await?;

    Ok(())
}

/// Serve on an ephemeral localhost port in the background, returning the bound address
pub async fn spawn_server(ledger: Arc<ActivityLedger>) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(ledger);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("Insight mock server stopped: {}", e);
        }
    });

    log::debug!("Insight mock server spawned on http://{}", addr);
    Ok(addr)
}
