//! Simulation request/response types and the persisted experiment record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::climate::ClimateSnapshot;

/// Score at or above which a high yield is advised.
pub const HIGH_YIELD_THRESHOLD: f64 = 75.0;

/// Score at or above which (and below [`HIGH_YIELD_THRESHOLD`]) a moderate yield is advised.
pub const MODERATE_YIELD_THRESHOLD: f64 = 50.0;

/// Body of `POST /simulate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub crop: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
}

impl SimulationRequest {
    pub fn banded(crop: &str, rainfall: &str, temperature: &str) -> Self {
        Self {
            crop: crop.to_string(),
            rainfall: Some(rainfall.to_string()),
            temperature: Some(temperature.to_string()),
        }
    }

    pub fn crop_only(crop: &str) -> Self {
        Self {
            crop: crop.to_string(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Advice
// ============================================================================

/// Three-tier advisory derived from the yield score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceTier {
    High,
    Moderate,
    Low,
}

impl AdviceTier {
    /// Band a score. NaN lands in the low tier.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_YIELD_THRESHOLD {
            Self::High
        } else if score >= MODERATE_YIELD_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::High => "High yield expected. Climate conditions are favorable.",
            Self::Moderate => "Moderate yield expected. Monitor field conditions closely.",
            Self::Low => "Low yield expected. Environmental stress detected.",
        }
    }
}

/// Climate values echoed back in snapshot modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateUsed {
    pub rainfall: f64,
    pub temperature: f64,
    pub ndvi: f64,
}

impl From<ClimateSnapshot> for ClimateUsed {
    fn from(s: ClimateSnapshot) -> Self {
        Self {
            rainfall: s.rainfall_mm,
            temperature: s.temperature_celsius,
            ndvi: s.ndvi,
        }
    }
}

/// Response of `POST /simulate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub yield_score: f64,
    pub advice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate_used: Option<ClimateUsed>,
}

// ============================================================================
// Experiment records
// ============================================================================

/// A climate input as it is stored: band text or a measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedValue {
    Measured(f64),
    Band(String),
}

/// Record contents before the store assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentEntry {
    pub crop: String,
    pub rainfall: Option<RecordedValue>,
    pub temperature: Option<RecordedValue>,
    pub ndvi: Option<f64>,
    pub yield_score: f64,
    pub advice: String,
}

/// Persisted simulation outcome. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: String,
    pub crop: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<RecordedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<RecordedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndvi: Option<f64>,
    pub yield_score: f64,
    pub advice: String,
    pub timestamp: DateTime<Utc>,
}

impl ExperimentRecord {
    pub fn from_entry(id: String, entry: ExperimentEntry, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            crop: entry.crop,
            rainfall: entry.rainfall,
            temperature: entry.temperature,
            ndvi: entry.ndvi,
            yield_score: entry.yield_score,
            advice: entry.advice,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advice_boundaries() {
        assert_eq!(AdviceTier::from_score(75.0), AdviceTier::High);
        assert_eq!(AdviceTier::from_score(74.0), AdviceTier::Moderate);
        assert_eq!(AdviceTier::from_score(74.999), AdviceTier::Moderate);
        assert_eq!(AdviceTier::from_score(50.0), AdviceTier::Moderate);
        assert_eq!(AdviceTier::from_score(49.0), AdviceTier::Low);
        assert_eq!(AdviceTier::from_score(f64::NAN), AdviceTier::Low);
    }

    #[test]
    fn test_advice_unclamped_scores() {
        assert_eq!(AdviceTier::from_score(140.0), AdviceTier::High);
        assert_eq!(AdviceTier::from_score(-12.0), AdviceTier::Low);
    }

    #[test]
    fn test_result_omits_climate_when_absent() {
        let result = SimulationResult {
            yield_score: 70.0,
            advice: AdviceTier::Moderate.message().to_string(),
            climate_used: None,
        };
        let v = serde_json::to_value(&result).unwrap();
        assert!(v.get("climate_used").is_none());
        assert_eq!(v["yield_score"], 70.0);
    }

    #[test]
    fn test_recorded_value_serializes_untagged() {
        let band = serde_json::to_value(RecordedValue::Band("high".into())).unwrap();
        let measured = serde_json::to_value(RecordedValue::Measured(120.5)).unwrap();
        assert_eq!(band, serde_json::json!("high"));
        assert_eq!(measured, serde_json::json!(120.5));
    }

    #[test]
    fn test_request_optional_bands_default_to_none() {
        let req: SimulationRequest = serde_json::from_str(r#"{"crop": "Maize"}"#).unwrap();
        assert_eq!(req.crop, "Maize");
        assert!(req.rainfall.is_none());
        assert!(req.temperature.is_none());
    }
}
