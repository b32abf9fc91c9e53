//! REST query surface
//!
//! Read-only HTTP interface over the latest-snapshot cache and the sample
//! store. Handlers never block on a live scan; they serve the last known
//! good state immediately.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Liveness and scheduler state
//! - `GET /api/v1/snapshot` - Most recently completed snapshot
//! - `GET /api/v1/history?metric=&source=&limit=` - Recent samples

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "127.0.0.1:8080")
    pub bind_addr: SocketAddr,

    /// Enable CORS for dashboards served from elsewhere
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().expect("valid default bind addr"),
            enable_cors: true,
        }
    }
}

/// Build the router. Separated from serving so tests can drive it directly.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/snapshot", get(routes::snapshot::latest_snapshot))
        .route("/api/v1/history", get(routes::history::sample_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server in a background task.
///
/// Returns the server's local address (useful when binding to port 0).
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
