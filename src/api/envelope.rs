//! Error envelope for API failures.
//!
//! Every error response has the shape
//! `{ "error": { "code": "...", "message": "..." } }`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::simulator::SimulationError;

/// Error detail inside [`ApiErrorResponse`].
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
}

/// Request-level failure mapped to an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PredictionService(String),
    Persistence(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PredictionService(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PredictionService(_) => "PREDICTION_SERVICE_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    fn into_message(self) -> String {
        match self {
            Self::BadRequest(m)
            | Self::NotFound(m)
            | Self::PredictionService(m)
            | Self::Persistence(m) => m,
        }
    }
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::Validation(msg) => Self::BadRequest(msg),
            SimulationError::Prediction(e) => {
                error!(error = %e, "Prediction service call failed");
                Self::PredictionService(e.to_string())
            }
            SimulationError::Persistence(e) => {
                error!(error = %e, "Failed to record experiment");
                Self::Persistence(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected request body");
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.into_message(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}
