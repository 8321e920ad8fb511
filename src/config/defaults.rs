//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Server
// ============================================================================

/// HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

// ============================================================================
// Storage
// ============================================================================

/// Object holding the crop rule table.
pub const RULES_BLOB_NAME: &str = "crop_rules.json";

/// Object holding the climate snapshot.
pub const CLIMATE_BLOB_NAME: &str = "climate_data.json";

/// Root directory for the local blob backend (`{root}/{bucket}/{object}`).
pub const BLOB_ROOT: &str = "./buckets";

/// Public object endpoint for the HTTP blob backend.
pub const BLOB_BASE_URL: &str = "https://storage.googleapis.com";

/// Timeout for a single blob fetch (seconds).
pub const BLOB_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Prediction service
// ============================================================================

/// Timeout for a single prediction call (seconds).
pub const PREDICTION_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Recorder
// ============================================================================

/// Sled database directory.
pub const DATA_DIR: &str = "./data/experiments.db";

/// Collection used by the banded mode.
pub const BANDED_COLLECTION: &str = "simulations";

/// Collection used by the climate snapshot modes.
pub const CLIMATE_COLLECTION: &str = "experimentations";

/// Records retained by the in-memory recorder before the oldest are evicted.
pub const IN_MEMORY_MAX_RECORDS: usize = 10_000;

// ============================================================================
// API
// ============================================================================

/// Default page size for `GET /experiments`.
pub const EXPERIMENTS_DEFAULT_LIMIT: usize = 20;

/// Upper bound on `GET /experiments?limit=`.
pub const EXPERIMENTS_MAX_LIMIT: usize = 200;
