//! Startup wiring: turn a validated [`ServiceConfig`] into a ready [`Simulator`].
//!
//! Every artifact is loaded before the listener binds. Any failure here is
//! fatal; the service never serves traffic without its rule table.

use std::sync::Arc;
use tracing::info;

use crate::climate::ClimateProvider;
use crate::config::{BlobBackend, RecorderBackend, ScoringMode, ServiceConfig};
use crate::predictor::{DeterministicPredictor, PredictionError, RemotePredictor, YieldPredictor};
use crate::rules::{ConfigLoadError, RuleStore};
use crate::simulator::Simulator;
use crate::storage::{
    BlobError, BlobStore, ExperimentRecorder, HttpBlobStore, InMemoryRecorder, LocalFsBlobStore,
    PersistenceError, SledRecorder,
};

/// Startup failures
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Load(#[from] ConfigLoadError),
    #[error("failed to build blob client: {0}")]
    BlobClient(#[from] BlobError),
    #[error("failed to build prediction client: {0}")]
    PredictionClient(#[from] PredictionError),
    #[error("failed to open experiment store: {0}")]
    Recorder(#[from] PersistenceError),
    #[error("prediction.url is required in remote mode")]
    MissingPredictionUrl,
}

/// Construct the blob backend named in the config.
pub fn build_blob_store(config: &ServiceConfig) -> Result<Box<dyn BlobStore>, StartupError> {
    let store: Box<dyn BlobStore> = match config.storage.backend {
        BlobBackend::Local => Box::new(LocalFsBlobStore::new(&config.storage.root)),
        BlobBackend::Http => Box::new(HttpBlobStore::new(
            &config.storage.base_url,
            config.blob_timeout(),
        )?),
    };
    Ok(store)
}

/// Construct the experiment recorder named in the config.
pub fn build_recorder(config: &ServiceConfig) -> Result<Arc<dyn ExperimentRecorder>, StartupError> {
    let collection = config.collection_name();
    let recorder: Arc<dyn ExperimentRecorder> = match config.recorder.backend {
        RecorderBackend::Sled => {
            if let Some(parent) = config.recorder.data_dir.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PersistenceError::Storage(e.to_string()))?;
            }
            Arc::new(SledRecorder::open(&config.recorder.data_dir, collection)?)
        }
        RecorderBackend::Memory => Arc::new(InMemoryRecorder::new(collection)),
    };
    Ok(recorder)
}

/// Load rules (and climate, in snapshot modes) and assemble the simulator.
pub async fn build_simulator(
    config: &ServiceConfig,
    blobs: &dyn BlobStore,
    recorder: Arc<dyn ExperimentRecorder>,
) -> Result<Simulator, StartupError> {
    let bucket = config.storage.bucket.as_str();
    let mode = config.scoring.mode;

    let rules = RuleStore::new(blobs, bucket, &config.storage.rules_blob)
        .load()
        .await?;

    let climate = if mode.uses_snapshot() {
        ClimateProvider::load_snapshot(blobs, bucket, &config.storage.climate_blob).await?
    } else {
        ClimateProvider::Banded {
            strict: config.scoring.strict_bands,
        }
    };

    let predictor: Arc<dyn YieldPredictor> = match mode {
        ScoringMode::Banded | ScoringMode::Climate => Arc::new(DeterministicPredictor),
        ScoringMode::Remote => {
            let url = config
                .prediction
                .url
                .as_deref()
                .ok_or(StartupError::MissingPredictionUrl)?;
            let remote = RemotePredictor::new(url, config.prediction_timeout())?;
            info!(url = remote.predict_url(), "Remote prediction enabled");
            Arc::new(remote)
        }
    };

    info!(
        mode = %mode,
        predictor = predictor.strategy_name(),
        recorder = recorder.backend_name(),
        collection = recorder.collection(),
        "Simulator ready"
    );
    Ok(Simulator::new(rules, climate, predictor, recorder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBlobStore;

    const RULES: &str = r#"{"wheat": {"base_yield": 60}}"#;
    const CLIMATE: &str =
        r#"{"avg_rainfall": 40.0, "avg_temperature_celsius": 31.0, "avg_ndvi": 0.5}"#;

    fn config(mode: ScoringMode) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.storage.bucket = "farm".to_string();
        config.scoring.mode = mode;
        config.recorder.backend = RecorderBackend::Memory;
        config
    }

    #[tokio::test]
    async fn test_banded_mode_needs_only_rules() {
        let config = config(ScoringMode::Banded);
        let blobs = InMemoryBlobStore::new().with_object("farm", "crop_rules.json", RULES);
        let recorder = build_recorder(&config).unwrap();
        let sim = build_simulator(&config, &blobs, recorder).await.unwrap();
        assert!(!sim.climate().is_snapshot());
        assert_eq!(sim.predictor_name(), "deterministic");
        assert_eq!(sim.recorder().collection(), "simulations");
    }

    #[tokio::test]
    async fn test_climate_mode_loads_snapshot() {
        let config = config(ScoringMode::Climate);
        let blobs = InMemoryBlobStore::new()
            .with_object("farm", "crop_rules.json", RULES)
            .with_object("farm", "climate_data.json", CLIMATE);
        let recorder = build_recorder(&config).unwrap();
        let sim = build_simulator(&config, &blobs, recorder).await.unwrap();
        assert!(sim.climate().is_snapshot());
        assert_eq!(sim.recorder().collection(), "experimentations");
    }

    #[tokio::test]
    async fn test_missing_rules_is_fatal() {
        let config = config(ScoringMode::Banded);
        let blobs = InMemoryBlobStore::new();
        let recorder = build_recorder(&config).unwrap();
        let err = build_simulator(&config, &blobs, recorder).await.err().unwrap();
        assert!(matches!(err, StartupError::Load(ConfigLoadError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_missing_climate_is_fatal_in_snapshot_mode() {
        let config = config(ScoringMode::Climate);
        let blobs = InMemoryBlobStore::new().with_object("farm", "crop_rules.json", RULES);
        let recorder = build_recorder(&config).unwrap();
        let err = build_simulator(&config, &blobs, recorder).await.err().unwrap();
        assert!(matches!(err, StartupError::Load(ConfigLoadError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_remote_mode_without_url() {
        let config = config(ScoringMode::Remote);
        let blobs = InMemoryBlobStore::new()
            .with_object("farm", "crop_rules.json", RULES)
            .with_object("farm", "climate_data.json", CLIMATE);
        let recorder = build_recorder(&config).unwrap();
        let err = build_simulator(&config, &blobs, recorder).await.err().unwrap();
        assert!(matches!(err, StartupError::MissingPredictionUrl));
    }

    #[test]
    fn test_sled_recorder_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(ScoringMode::Banded);
        config.recorder.backend = RecorderBackend::Sled;
        config.recorder.data_dir = dir.path().join("nested/experiments.db");
        let recorder = build_recorder(&config).unwrap();
        assert_eq!(recorder.backend_name(), "sled");
    }
}
