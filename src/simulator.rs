//! Per-request simulation pipeline.
//!
//! `received → rules_resolved → climate_resolved → scored → advised →
//! recorded → responded`. Each run is independent; all shared state is
//! read-only. A prediction or persistence failure fails the whole run and
//! no score is returned.

use std::sync::Arc;
use tracing::{debug, info};

use crate::climate::{ClimateInput, ClimateProvider};
use crate::predictor::{PredictionError, YieldPredictor};
use crate::rules::{normalize_crop, CropRuleTable};
use crate::storage::{ExperimentRecorder, PersistenceError};
use crate::types::{
    AdviceTier, ClimateUsed, ExperimentEntry, RecordedValue, SimulationRequest, SimulationResult,
};

/// Per-request failure
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Immutable dependencies of the simulation pipeline, built once at startup.
#[derive(Clone)]
pub struct Simulator {
    rules: Arc<CropRuleTable>,
    climate: Arc<ClimateProvider>,
    predictor: Arc<dyn YieldPredictor>,
    recorder: Arc<dyn ExperimentRecorder>,
}

impl Simulator {
    pub fn new(
        rules: CropRuleTable,
        climate: ClimateProvider,
        predictor: Arc<dyn YieldPredictor>,
        recorder: Arc<dyn ExperimentRecorder>,
    ) -> Self {
        Self {
            rules: Arc::new(rules),
            climate: Arc::new(climate),
            predictor,
            recorder,
        }
    }

    pub fn rules(&self) -> &CropRuleTable {
        &self.rules
    }

    pub fn climate(&self) -> &ClimateProvider {
        &self.climate
    }

    pub fn recorder(&self) -> &dyn ExperimentRecorder {
        self.recorder.as_ref()
    }

    pub fn predictor_name(&self) -> &'static str {
        self.predictor.strategy_name()
    }

    /// Run one simulation end to end.
    pub async fn run(&self, request: &SimulationRequest) -> Result<SimulationResult, SimulationError> {
        let crop = normalize_crop(&request.crop);
        if crop.is_empty() {
            return Err(SimulationError::Validation("crop must not be empty".to_string()));
        }
        debug!(crop = %crop, "received");

        let base_yield = self.rules.lookup(&crop);
        debug!(crop = %crop, base_yield, known = self.rules.contains(&crop), "rules_resolved");

        let climate = self
            .climate
            .resolve(request.rainfall.as_deref(), request.temperature.as_deref())
            .map_err(|e| SimulationError::Validation(e.to_string()))?;
        debug!(crop = %crop, climate = ?climate, "climate_resolved");

        let yield_score = self.predictor.predict(base_yield, &climate).await?;
        debug!(crop = %crop, yield_score, strategy = self.predictor.strategy_name(), "scored");

        let advice = AdviceTier::from_score(yield_score).message().to_string();
        debug!(crop = %crop, advice = %advice, "advised");

        let entry = self.build_entry(&crop, request, &climate, yield_score, &advice);
        let record = self.recorder.record(entry)?;
        debug!(crop = %crop, id = %record.id, collection = self.recorder.collection(), "recorded");

        info!(crop = %crop, yield_score, id = %record.id, "Simulation complete");

        let climate_used = match climate {
            ClimateInput::Measured(snapshot) => Some(ClimateUsed::from(snapshot)),
            ClimateInput::Bands { .. } => None,
        };
        Ok(SimulationResult {
            yield_score,
            advice,
            climate_used,
        })
    }

    /// Banded records keep the caller's raw text (normalized) so neutralized
    /// values stay visible in the experiment log.
    fn build_entry(
        &self,
        crop: &str,
        request: &SimulationRequest,
        climate: &ClimateInput,
        yield_score: f64,
        advice: &str,
    ) -> ExperimentEntry {
        let band_text =
            |raw: Option<&String>| raw.map(|s| RecordedValue::Band(s.trim().to_lowercase()));

        let (rainfall, temperature, ndvi) = match climate {
            ClimateInput::Bands { .. } => (
                band_text(request.rainfall.as_ref()),
                band_text(request.temperature.as_ref()),
                None,
            ),
            ClimateInput::Measured(snapshot) => (
                Some(RecordedValue::Measured(snapshot.rainfall_mm)),
                Some(RecordedValue::Measured(snapshot.temperature_celsius)),
                Some(snapshot.ndvi),
            ),
        };

        ExperimentEntry {
            crop: crop.to_string(),
            rainfall,
            temperature,
            ndvi,
            yield_score,
            advice: advice.to_string(),
        }
    }
}
