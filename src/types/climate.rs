//! Climate types: numeric snapshots and qualitative bands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ClimateSnapshot
// ============================================================================

/// Ambient climate metrics used for numeric scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateSnapshot {
    /// Average rainfall (mm)
    pub rainfall_mm: f64,
    /// Average air temperature (°C)
    pub temperature_celsius: f64,
    /// Normalized difference vegetation index, 0–1
    pub ndvi: f64,
}

/// On-blob layout of the climate snapshot (`climate_data.json`).
///
/// Unknown keys are ignored so the data team can add fields freely.
#[derive(Debug, Clone, Deserialize)]
pub struct ClimateBlob {
    pub avg_rainfall: f64,
    pub avg_temperature_celsius: f64,
    pub avg_ndvi: f64,
}

impl From<ClimateBlob> for ClimateSnapshot {
    fn from(blob: ClimateBlob) -> Self {
        Self {
            rainfall_mm: blob.avg_rainfall,
            temperature_celsius: blob.avg_temperature_celsius,
            ndvi: blob.avg_ndvi,
        }
    }
}

impl ClimateSnapshot {
    /// Check that every metric is finite and NDVI lies in [0, 1].
    pub fn check(&self) -> Result<(), String> {
        let fields = [
            ("avg_rainfall", self.rainfall_mm),
            ("avg_temperature_celsius", self.temperature_celsius),
            ("avg_ndvi", self.ndvi),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{name} must be a finite number, got {value}"));
            }
        }
        if !(0.0..=1.0).contains(&self.ndvi) {
            return Err(format!("avg_ndvi must be within [0, 1], got {}", self.ndvi));
        }
        Ok(())
    }
}

// ============================================================================
// Band
// ============================================================================

/// Qualitative level for a climate factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Low,
    Medium,
    High,
}

impl Band {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a band string is not one of `low|medium|high`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized band '{0}' (expected low, medium or high)")]
pub struct UnknownBand(pub String);

impl FromStr for Band {
    type Err = UnknownBand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownBand(s.to_string())),
        }
    }
}
