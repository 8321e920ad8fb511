//! Shared data types for the yield simulator.

pub mod climate;
pub mod simulation;

pub use climate::{Band, ClimateBlob, ClimateSnapshot, UnknownBand};
pub use simulation::{
    AdviceTier, ClimateUsed, ExperimentEntry, ExperimentRecord, RecordedValue, SimulationRequest,
    SimulationResult, HIGH_YIELD_THRESHOLD, MODERATE_YIELD_THRESHOLD,
};
