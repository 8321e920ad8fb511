//! Yield prediction strategies
//!
//! - [`DeterministicPredictor`]: threshold modifiers on top of the crop's base yield,
//!   clamped to [0, 100]
//! - [`RemotePredictor`]: delegates to an external `/predict` endpoint and trusts
//!   its value as-is
//!
//! Neither strategy falls back to the other. A remote failure is a request failure.

mod deterministic;
mod remote;

pub use deterministic::{
    banded_modifier, clamp_score, measured_modifier, rainfall_band_effect, rainfall_mm_effect,
    temperature_band_effect, temperature_c_effect, DeterministicPredictor, NDVI_WEIGHT,
};
pub use remote::{PredictRequest, PredictResponse, RemotePredictor};

use async_trait::async_trait;

use crate::climate::ClimateInput;

/// Prediction failures. Only the remote strategy produces these.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("prediction request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("prediction service returned status {0}")]
    ServerError(reqwest::StatusCode),
    #[error("malformed prediction response: {0}")]
    MalformedResponse(String),
    #[error("remote prediction needs measured climate, got qualitative bands")]
    UnsupportedInput,
}

/// Produces a yield score from climate and a crop's base yield.
#[async_trait]
pub trait YieldPredictor: Send + Sync {
    async fn predict(&self, base_yield: f64, climate: &ClimateInput) -> Result<f64, PredictionError>;

    /// Strategy name for logging
    fn strategy_name(&self) -> &'static str;
}
