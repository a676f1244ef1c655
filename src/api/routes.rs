//! Route tables.

use axum::routing::get;
use axum::Router;

use super::handlers::{self, ApiState};

/// Routes mounted under `/api/v2`.
pub fn v2_api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/frame", get(handlers::latest_frame))
        .route("/items", get(handlers::items))
        .route("/items/:barcode", get(handlers::item))
        .route("/geometry", get(handlers::geometry))
        .route("/stats", get(handlers::stats))
        .with_state(state)
}

/// Unversioned liveness probe at `/health`.
pub fn legacy_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::legacy_health))
        .with_state(state)
}
