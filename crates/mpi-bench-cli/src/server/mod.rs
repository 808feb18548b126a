//! JSON dashboard API
//!
//! Exposes cluster control, benchmark runs and result handling over HTTP
//! for a browser front end. The current result is owned by
//! [`DashboardState`], one per server.
//!
//! # API Endpoints
//!
//! - `GET /health`
//! - `GET /api/cluster/status`, `POST /api/cluster/start`,
//!   `POST /api/cluster/stop`, `GET /api/cluster/logs/:node`
//! - `POST /api/benchmarks`
//! - `GET /api/results/current`, `GET /api/results/current/report`,
//!   `GET /api/results/current/csv`, `POST /api/results/current/save`
//! - `GET /api/results`, `POST /api/results/:name/load`

pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::DashboardState;

use std::sync::Arc;

/// Start the HTTP server and serve until the process exits.
pub async fn start_server(
    state: Arc<DashboardState>,
    bind_addr: &str,
) -> Result<(), std::io::Error> {
    let app = create_router(state);

    tracing::info!("Starting benchmark dashboard API on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
