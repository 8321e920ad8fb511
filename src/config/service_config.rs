//! Service configuration: TOML file plus environment overrides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "YIELD_SIM_CONFIG";

/// Config file picked up from the working directory when present.
pub const LOCAL_CONFIG_FILE: &str = "yield_sim.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("invalid value for {var}: '{value}' ({reason})")]
    InvalidEnv {
        var: String,
        value: String,
        reason: String,
    },
    #[error("configuration invalid: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Enumerated settings
// ============================================================================

/// How a request's yield score is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Request-supplied bands, deterministic scoring.
    #[default]
    Banded,
    /// Climate snapshot from storage, deterministic numeric scoring.
    Climate,
    /// Climate snapshot from storage, remote prediction service.
    Remote,
}

impl ScoringMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Banded => "banded",
            Self::Climate => "climate",
            Self::Remote => "remote",
        }
    }

    /// Whether climate comes from the stored snapshot.
    pub const fn uses_snapshot(self) -> bool {
        matches!(self, Self::Climate | Self::Remote)
    }

    pub const fn default_collection(self) -> &'static str {
        match self {
            Self::Banded => defaults::BANDED_COLLECTION,
            Self::Climate | Self::Remote => defaults::CLIMATE_COLLECTION,
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "banded" => Ok(Self::Banded),
            "climate" => Ok(Self::Climate),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown scoring mode '{other}' (banded, climate, remote)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    #[default]
    Local,
    Http,
}

impl FromStr for BlobBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown blob backend '{other}' (local, http)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderBackend {
    #[default]
    Sled,
    Memory,
}

impl FromStr for RecorderBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" => Ok(Self::Sled),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown recorder backend '{other}' (sled, memory)")),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::SERVER_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: BlobBackend,
    /// Bucket holding the rules and climate objects.
    pub bucket: String,
    pub rules_blob: String,
    pub climate_blob: String,
    /// Local backend root.
    pub root: PathBuf,
    /// HTTP backend endpoint.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            bucket: String::new(),
            rules_blob: defaults::RULES_BLOB_NAME.to_string(),
            climate_blob: defaults::CLIMATE_BLOB_NAME.to_string(),
            root: PathBuf::from(defaults::BLOB_ROOT),
            base_url: defaults::BLOB_BASE_URL.to_string(),
            timeout_secs: defaults::BLOB_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub mode: ScoringMode,
    /// Reject unrecognized bands with 400 instead of treating them as neutral.
    pub strict_bands: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictionConfig {
    /// Service root; `/predict` is appended.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: defaults::PREDICTION_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfig {
    pub backend: RecorderBackend,
    pub data_dir: PathBuf,
    /// Defaults to the scoring mode's collection when unset.
    pub collection: Option<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            backend: RecorderBackend::default(),
            data_dir: PathBuf::from(defaults::DATA_DIR),
            collection: None,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub scoring: ScoringConfig,
    pub prediction: PredictionConfig,
    pub recorder: RecorderConfig,
}

// ============================================================================
// Loading
// ============================================================================

impl ServiceConfig {
    /// Load configuration.
    ///
    /// File search order: `explicit`, then `YIELD_SIM_CONFIG`, then
    /// `./yield_sim.toml`, then built-in defaults. Environment overrides are
    /// applied on top. A named file that cannot be read is an error.
    /// The result is not validated; call [`ServiceConfig::validate`] after
    /// applying any CLI overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let local = PathBuf::from(LOCAL_CONFIG_FILE);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load_from_file(&path)?,
            None if local.exists() => Self::load_from_file(&local)?,
            None => {
                info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
                Self::default()
            }
        };

        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        info!(path = %path.display(), mode = %config.scoring.mode, "Loaded service config");
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SERVER_ADDR") {
            self.server.addr = v;
        }
        if let Some(v) = get("BUCKET_NAME") {
            self.storage.bucket = v;
        }
        if let Some(v) = get("RULES_BLOB_NAME") {
            self.storage.rules_blob = v;
        }
        if let Some(v) = get("CLIMATE_BLOB_NAME") {
            self.storage.climate_blob = v;
        }
        if let Some(v) = get("BLOB_BACKEND") {
            self.storage.backend = parse_env("BLOB_BACKEND", &v)?;
        }
        if let Some(v) = get("BLOB_BASE_URL") {
            self.storage.base_url = v;
        }
        if let Some(v) = get("BLOB_ROOT") {
            self.storage.root = PathBuf::from(v);
        }
        if let Some(v) = get("SCORING_MODE") {
            self.scoring.mode = parse_env("SCORING_MODE", &v)?;
        }
        if let Some(v) = get("STRICT_BANDS") {
            self.scoring.strict_bands = parse_bool("STRICT_BANDS", &v)?;
        }
        if let Some(v) = get("PREDICTION_URL") {
            self.prediction.url = Some(v);
        }
        if let Some(v) = get("PREDICTION_TIMEOUT_SECS") {
            self.prediction.timeout_secs = parse_env("PREDICTION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("RECORDER_BACKEND") {
            self.recorder.backend = parse_env("RECORDER_BACKEND", &v)?;
        }
        if let Some(v) = get("DATA_DIR") {
            self.recorder.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("EXPERIMENT_COLLECTION") {
            self.recorder.collection = Some(v);
        }
        Ok(())
    }

    /// Collection experiment records are appended to.
    pub fn collection_name(&self) -> &str {
        self.recorder
            .collection
            .as_deref()
            .unwrap_or_else(|| self.scoring.mode.default_collection())
    }

    pub fn prediction_timeout(&self) -> Duration {
        Duration::from_secs(self.prediction.timeout_secs)
    }

    pub fn blob_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.timeout_secs)
    }

    /// Validate the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }
        if self.storage.bucket.trim().is_empty() {
            errors.push("storage.bucket (BUCKET_NAME) must be set".to_string());
        }
        if self.storage.rules_blob.trim().is_empty() {
            errors.push("storage.rules_blob (RULES_BLOB_NAME) must not be empty".to_string());
        }
        if self.scoring.mode.uses_snapshot() && self.storage.climate_blob.trim().is_empty() {
            errors.push("storage.climate_blob (CLIMATE_BLOB_NAME) must not be empty".to_string());
        }
        if self.storage.timeout_secs == 0 {
            errors.push("storage.timeout_secs must be > 0".to_string());
        }
        if self.storage.backend == BlobBackend::Http && !is_http_url(&self.storage.base_url) {
            errors.push(format!(
                "storage.base_url must be an http(s) URL, got '{}'",
                self.storage.base_url
            ));
        }

        if self.scoring.mode == ScoringMode::Remote {
            match self.prediction.url.as_deref() {
                None => errors.push(
                    "prediction.url (PREDICTION_URL) is required in remote mode".to_string(),
                ),
                Some(url) if !is_http_url(url) => {
                    errors.push(format!("prediction.url must be an http(s) URL, got '{url}'"));
                }
                Some(_) => {}
            }
        }
        if self.prediction.timeout_secs == 0 {
            errors.push("prediction.timeout_secs must be > 0".to_string());
        }

        if self.collection_name().trim().is_empty() {
            errors.push("recorder.collection must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    (url.starts_with("http://") && url.len() > "http://".len())
        || (url.starts_with("https://") && url.len() > "https://".len())
}

fn parse_env<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
