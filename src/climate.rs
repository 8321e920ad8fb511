//! Climate resolution for a simulation request.
//!
//! Snapshot mode loads one [`ClimateSnapshot`] at startup and reuses it for
//! every request. Banded mode takes `low|medium|high` levels from the
//! request itself.

use tracing::{debug, info};

use crate::rules::ConfigLoadError;
use crate::storage::BlobStore;
use crate::types::{Band, ClimateBlob, ClimateSnapshot, UnknownBand};

/// Climate actually used for scoring one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ClimateInput {
    /// Qualitative levels. `None` is neutral.
    Bands {
        rainfall: Option<Band>,
        temperature: Option<Band>,
    },
    /// Numeric measurements.
    Measured(ClimateSnapshot),
}

/// Source of climate data, fixed by deployment configuration.
#[derive(Debug, Clone)]
pub enum ClimateProvider {
    /// Process-wide snapshot loaded at startup.
    Snapshot(ClimateSnapshot),
    /// Per-request bands. With `strict`, unrecognized values are rejected.
    Banded { strict: bool },
}

impl ClimateProvider {
    /// Load the process-wide snapshot from `{bucket}/{object}`.
    pub async fn load_snapshot(
        blobs: &dyn BlobStore,
        bucket: &str,
        object: &str,
    ) -> Result<Self, ConfigLoadError> {
        let bytes = blobs
            .fetch(bucket, object)
            .await
            .map_err(|source| ConfigLoadError::Fetch {
                bucket: bucket.to_string(),
                object: object.to_string(),
                source,
            })?;

        let blob: ClimateBlob =
            serde_json::from_slice(&bytes).map_err(|source| ConfigLoadError::Parse {
                object: object.to_string(),
                source,
            })?;
        let snapshot = ClimateSnapshot::from(blob);
        snapshot.check().map_err(|reason| ConfigLoadError::Invalid {
            object: object.to_string(),
            reason,
        })?;

        info!(
            bucket,
            object,
            rainfall_mm = snapshot.rainfall_mm,
            temperature_c = snapshot.temperature_celsius,
            ndvi = snapshot.ndvi,
            "Climate snapshot loaded"
        );
        Ok(Self::Snapshot(snapshot))
    }

    /// Resolve the climate for a request.
    ///
    /// Bands sent to a snapshot provider are ignored.
    pub fn resolve(
        &self,
        rainfall: Option<&str>,
        temperature: Option<&str>,
    ) -> Result<ClimateInput, UnknownBand> {
        match self {
            Self::Snapshot(snapshot) => {
                if rainfall.is_some() || temperature.is_some() {
                    debug!("Ignoring request bands; climate comes from the loaded snapshot");
                }
                Ok(ClimateInput::Measured(*snapshot))
            }
            Self::Banded { strict } => Ok(ClimateInput::Bands {
                rainfall: parse_band(rainfall, *strict)?,
                temperature: parse_band(temperature, *strict)?,
            }),
        }
    }

    pub const fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }
}

fn parse_band(raw: Option<&str>, strict: bool) -> Result<Option<Band>, UnknownBand> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<Band>() {
        Ok(band) => Ok(Some(band)),
        Err(e) if strict => Err(e),
        Err(_) => {
            debug!(band = raw, "Unrecognized band treated as neutral");
            Ok(None)
        }
    }
}
