//! Read-only HTTP view of the running belt.
//!
//! - `/api/v2/*`: enveloped JSON for renderers and table views
//! - `/health`: bare liveness probe

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Same-origin only unless `BELTSYNC_CORS_ORIGINS` lists allowed origins
/// (comma-separated).
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var("BELTSYNC_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v2", routes::v2_api_routes(state.clone()))
        .merge(routes::legacy_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer())
}
