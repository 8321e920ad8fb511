//! REST API module using Axum
//!
//! Provides the HTTP surface of the yield simulator:
//! - `POST /simulate`, `GET /health`, `GET /experiments`
//! - `OPTIONS` on any path answered with `{}`
//! - permissive CORS (any origin, method and header; no credentials)

pub mod envelope;
pub mod handlers;
pub mod middleware;
mod routes;

pub use envelope::ApiError;

use axum::middleware as axum_mw;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::simulator::Simulator;

/// Any origin, method and header. Credentials are never allowed.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the complete application router.
pub fn create_app(simulator: Simulator) -> Router {
    routes::api_routes(simulator)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .layer(axum_mw::from_fn(middleware::answer_options))
}
