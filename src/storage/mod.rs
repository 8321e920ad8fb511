//! Storage backends
//!
//! - `blob`: read-only object access for startup artifacts (rules, climate)
//! - `experiments`: append-only persistence of simulation outcomes

pub mod blob;
pub mod experiments;

pub use blob::{BlobError, BlobStore, HttpBlobStore, InMemoryBlobStore, LocalFsBlobStore};
pub use experiments::{ExperimentRecorder, InMemoryRecorder, PersistenceError, SledRecorder};
