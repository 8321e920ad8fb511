//! Local threshold scoring.

use async_trait::async_trait;

use super::{PredictionError, YieldPredictor};
use crate::climate::ClimateInput;
use crate::types::{Band, ClimateSnapshot};

/// Scale applied to NDVI in the numeric modifier.
pub const NDVI_WEIGHT: f64 = 20.0;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

pub const fn rainfall_band_effect(band: Band) -> f64 {
    match band {
        Band::Low => -15.0,
        Band::Medium => 0.0,
        Band::High => 10.0,
    }
}

pub const fn temperature_band_effect(band: Band) -> f64 {
    match band {
        Band::Low => -5.0,
        Band::Medium => 10.0,
        Band::High => -10.0,
    }
}

pub fn rainfall_mm_effect(rainfall_mm: f64) -> f64 {
    if rainfall_mm < 50.0 {
        -20.0
    } else if rainfall_mm < 100.0 {
        5.0
    } else {
        10.0
    }
}

pub fn temperature_c_effect(temperature_c: f64) -> f64 {
    if temperature_c < 20.0 {
        -10.0
    } else if temperature_c < 30.0 {
        10.0
    } else {
        -5.0
    }
}

/// Modifier from qualitative bands. Absent bands contribute nothing.
pub fn banded_modifier(rainfall: Option<Band>, temperature: Option<Band>) -> f64 {
    rainfall.map_or(0.0, rainfall_band_effect) + temperature.map_or(0.0, temperature_band_effect)
}

/// Modifier from measured climate, including the NDVI contribution.
pub fn measured_modifier(climate: &ClimateSnapshot) -> f64 {
    rainfall_mm_effect(climate.rainfall_mm)
        + temperature_c_effect(climate.temperature_celsius)
        + climate.ndvi * NDVI_WEIGHT
}

/// Clamp to [0, 100]. NaN maps to 0.
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return MIN_SCORE;
    }
    raw.clamp(MIN_SCORE, MAX_SCORE)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicPredictor;

impl DeterministicPredictor {
    pub fn score(base_yield: f64, climate: &ClimateInput) -> f64 {
        let modifier = match climate {
            ClimateInput::Bands {
                rainfall,
                temperature,
            } => banded_modifier(*rainfall, *temperature),
            ClimateInput::Measured(snapshot) => measured_modifier(snapshot),
        };
        clamp_score(base_yield + modifier)
    }
}

#[async_trait]
impl YieldPredictor for DeterministicPredictor {
    async fn predict(&self, base_yield: f64, climate: &ClimateInput) -> Result<f64, PredictionError> {
        Ok(Self::score(base_yield, climate))
    }

    fn strategy_name(&self) -> &'static str {
        "deterministic"
    }
}
