//! Crop rule table: base yield per crop.
//!
//! Loaded once at startup from `{bucket}/{rules_blob}`. A missing or
//! malformed blob is fatal; there is no partial or default table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::storage::{BlobError, BlobStore};

/// Base yield used for crops absent from the table.
pub const DEFAULT_BASE_YIELD: f64 = 50.0;

/// Startup-time load failure for rules or climate blobs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to fetch {bucket}/{object}: {source}")]
    Fetch {
        bucket: String,
        object: String,
        #[source]
        source: BlobError,
    },
    #[error("failed to parse {object}: {source}")]
    Parse {
        object: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid contents in {object}: {reason}")]
    Invalid { object: String, reason: String },
}

/// Per-crop rule record as stored in the blob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRule {
    pub base_yield: f64,
}

/// Immutable crop name → rule mapping with lowercase keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropRuleTable {
    rules: HashMap<String, CropRule>,
}

/// Lowercase and trim a crop name for lookup or storage.
pub fn normalize_crop(crop: &str) -> String {
    crop.trim().to_lowercase()
}

impl CropRuleTable {
    /// Build a table from raw entries, normalizing keys.
    ///
    /// When two raw keys normalize to the same crop the one yielded last by
    /// the iterator wins. Blobs go through [`CropRuleTable::from_json`],
    /// which rejects such collisions instead.
    pub fn from_rules<I, K>(rules: I) -> Self
    where
        I: IntoIterator<Item = (K, CropRule)>,
        K: AsRef<str>,
    {
        Self {
            rules: rules
                .into_iter()
                .map(|(k, v)| (normalize_crop(k.as_ref()), v))
                .collect(),
        }
    }

    /// Parse the JSON blob form `{"wheat": {"base_yield": 60}, ...}`.
    pub fn from_json(object: &str, bytes: &[u8]) -> Result<Self, ConfigLoadError> {
        let raw: HashMap<String, CropRule> =
            serde_json::from_slice(bytes).map_err(|source| ConfigLoadError::Parse {
                object: object.to_string(),
                source,
            })?;

        if let Some((crop, rule)) = raw.iter().find(|(_, r)| !r.base_yield.is_finite()) {
            return Err(ConfigLoadError::Invalid {
                object: object.to_string(),
                reason: format!("base_yield for '{crop}' is not finite ({})", rule.base_yield),
            });
        }
        if raw.keys().any(|k| k.trim().is_empty()) {
            return Err(ConfigLoadError::Invalid {
                object: object.to_string(),
                reason: "crop names must not be blank".to_string(),
            });
        }

        let mut seen = HashMap::with_capacity(raw.len());
        for crop in raw.keys() {
            let normalized = normalize_crop(crop);
            if let Some(other) = seen.insert(normalized.clone(), crop) {
                return Err(ConfigLoadError::Invalid {
                    object: object.to_string(),
                    reason: format!(
                        "crop '{normalized}' defined more than once after normalization ('{other}', '{crop}')"
                    ),
                });
            }
        }

        Ok(Self::from_rules(raw))
    }

    /// Base yield for `crop`, or [`DEFAULT_BASE_YIELD`] when unknown.
    pub fn lookup(&self, crop: &str) -> f64 {
        self.rules
            .get(&normalize_crop(crop))
            .map_or(DEFAULT_BASE_YIELD, |r| r.base_yield)
    }

    pub fn contains(&self, crop: &str) -> bool {
        self.rules.contains_key(&normalize_crop(crop))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Loads the crop rule table from object storage.
pub struct RuleStore<'a> {
    blobs: &'a dyn BlobStore,
    bucket: &'a str,
    object: &'a str,
}

impl<'a> RuleStore<'a> {
    pub fn new(blobs: &'a dyn BlobStore, bucket: &'a str, object: &'a str) -> Self {
        Self {
            blobs,
            bucket,
            object,
        }
    }

    pub async fn load(&self) -> Result<CropRuleTable, ConfigLoadError> {
        let bytes = self
            .blobs
            .fetch(self.bucket, self.object)
            .await
            .map_err(|source| ConfigLoadError::Fetch {
                bucket: self.bucket.to_string(),
                object: self.object.to_string(),
                source,
            })?;

        let table = CropRuleTable::from_json(self.object, &bytes)?;
        info!(
            bucket = self.bucket,
            object = self.object,
            backend = self.blobs.backend_name(),
            crops = table.len(),
            "Crop rules loaded"
        );
        Ok(table)
    }
}
