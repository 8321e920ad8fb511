//! Service Configuration Module
//!
//! ## Loading Order
//!
//! 1. `--config` CLI flag or `YIELD_SIM_CONFIG` environment variable (path to TOML file)
//! 2. `yield_sim.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Environment overrides (`BUCKET_NAME`, `RULES_BLOB_NAME`, `SCORING_MODE`, ...)
//! are applied on top. The resulting [`ServiceConfig`] is passed into
//! startup explicitly; nothing reads it from a global.

mod service_config;
pub mod defaults;

pub use service_config::*;
