//! Crop Yield Simulator
//!
//! HTTP service that scores a crop's expected yield from climate inputs and
//! records every simulation.
//!
//! ## Architecture
//!
//! - **Rules**: crop → base yield table loaded from object storage at startup
//! - **Climate**: a stored climate snapshot, or per-request qualitative bands
//! - **Predictor**: deterministic threshold scoring, or a remote model service
//! - **Recorder**: append-only experiment log (sled or in-memory)
//! - **API**: Axum router exposing `/simulate`, `/health` and `/experiments`

pub mod api;
pub mod bootstrap;
pub mod climate;
pub mod config;
pub mod predictor;
pub mod rules;
pub mod simulator;
pub mod storage;
pub mod types;

pub use climate::{ClimateInput, ClimateProvider};
pub use config::{ScoringMode, ServiceConfig};
pub use predictor::{DeterministicPredictor, PredictionError, RemotePredictor, YieldPredictor};
pub use rules::{ConfigLoadError, CropRule, CropRuleTable, RuleStore, DEFAULT_BASE_YIELD};
pub use simulator::{SimulationError, Simulator};
pub use storage::{BlobStore, ExperimentRecorder, PersistenceError};
pub use types::{
    AdviceTier, Band, ClimateSnapshot, ExperimentRecord, SimulationRequest, SimulationResult,
};
