//! REST API over the dashboard.
//!
//! Provides four endpoints:
//! - `GET /regions`: region names in the historical data
//! - `GET /summary`: national mean IPM per year
//! - `GET /forecast?region=&horizon=&method=`: actual and forecast rows
//! - `POST /predict`: score one manual input

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::config::AppConfig;
use crate::dashboard::Dashboard;

pub use types::{ErrorResponse, ForecastQuery, ForecastResponse, PredictRequest, RegionsResponse};

/// Immutable application state shared across all request handlers.
pub struct AppState {
    /// Loaded model and historical data.
    pub dashboard: Dashboard,
    /// Defaults for omitted query parameters.
    pub config: AppConfig,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/regions", get(handlers::get_regions))
        .route("/summary", get(handlers::get_summary))
        .route("/forecast", get(handlers::get_forecast))
        .route("/predict", post(handlers::post_predict))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
