//! API route definitions
//!
//! - POST /simulate    - score a crop and record the experiment
//! - GET  /health      - liveness probe
//! - GET  /experiments - recent experiment records

use axum::routing::{get, post};
use axum::Router;

use super::envelope::ApiError;
use super::handlers;
use crate::simulator::Simulator;

pub fn api_routes(simulator: Simulator) -> Router {
    Router::new()
        .route("/simulate", post(handlers::simulate))
        .route("/health", get(handlers::health))
        .route("/experiments", get(handlers::list_experiments))
        .fallback(not_found)
        .with_state(simulator)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such endpoint".to_string())
}
