//! ExperimentRecorder trait: append-only experiment persistence
//!
//! Every simulation outcome is appended to a named collection:
//! - `SledRecorder`: one sled tree per collection, durable
//! - `InMemoryRecorder`: bounded ring for tests and throwaway deployments
//!
//! Sled records are never updated or deleted. Writes are synchronous and
//! un-retried; a failed write fails the request that produced it.

use chrono::Utc;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::RwLock;

use crate::config::defaults::{EXPERIMENTS_MAX_LIMIT, IN_MEMORY_MAX_RECORDS};

use crate::types::{ExperimentEntry, ExperimentRecord};

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for PersistenceError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Trait for append-only experiment storage
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across request handlers.
pub trait ExperimentRecorder: Send + Sync {
    /// Append one entry, assigning its id and UTC timestamp.
    fn record(&self, entry: ExperimentEntry) -> Result<ExperimentRecord, PersistenceError>;

    /// Most recent records, newest first
    fn recent(&self, limit: usize) -> Result<Vec<ExperimentRecord>, PersistenceError>;

    /// Number of stored records
    fn count(&self) -> Result<usize, PersistenceError>;

    /// Collection the records are appended to
    fn collection(&self) -> &str;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// Sled
// ============================================================================

/// Sled-backed recorder.
///
/// Keys are `Db::generate_id()` as big-endian bytes, so iteration order is
/// insertion order. The record id is the key rendered as 16 hex digits.
pub struct SledRecorder {
    db: sled::Db,
    tree: sled::Tree,
    collection: String,
}

impl SledRecorder {
    /// Open or create the database at `path` and the tree for `collection`.
    pub fn open<P: AsRef<Path>>(path: P, collection: &str) -> Result<Self, PersistenceError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        let tree = db.open_tree(collection)?;
        tracing::info!(path = ?path_ref, collection, "Experiment store opened");
        Ok(Self {
            db,
            tree,
            collection: collection.to_string(),
        })
    }
}

impl ExperimentRecorder for SledRecorder {
    fn record(&self, entry: ExperimentEntry) -> Result<ExperimentRecord, PersistenceError> {
        let key = self.db.generate_id()?;
        let record = ExperimentRecord::from_entry(format!("{key:016x}"), entry, Utc::now());
        let value = serde_json::to_vec(&record)?;

        self.tree.insert(key.to_be_bytes(), value)?;
        self.tree.flush()?;

        tracing::debug!(
            id = %record.id,
            crop = %record.crop,
            score = record.yield_score,
            "Stored experiment record"
        );
        Ok(record)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ExperimentRecord>, PersistenceError> {
        let mut records = Vec::with_capacity(limit.min(EXPERIMENTS_MAX_LIMIT));
        for item in self.tree.iter().rev().take(limit) {
            let (key, value) = item?;
            let record = serde_json::from_slice::<ExperimentRecord>(&value).map_err(|e| {
                tracing::error!(key = ?key, error = %e, "Unreadable experiment record");
                PersistenceError::Serialization(format!(
                    "record {} in '{}': {e}",
                    hex_key(&key),
                    self.collection
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.tree.len())
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

fn hex_key(key: &[u8]) -> String {
    <[u8; 8]>::try_from(key).map_or_else(
        |_| format!("{key:02x?}"),
        |bytes| format!("{:016x}", u64::from_be_bytes(bytes)),
    )
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory recorder. Not durable, data is lost on restart.
///
/// Holds at most `max_records`; the oldest record is evicted first, so
/// `count()` reports retained records only. Intended for tests and
/// `RECORDER_BACKEND=memory` demos.
pub struct InMemoryRecorder {
    state: RwLock<MemoryState>,
    collection: String,
    max_records: usize,
}

#[derive(Default)]
struct MemoryState {
    records: VecDeque<ExperimentRecord>,
    next_id: u64,
}

impl InMemoryRecorder {
    pub fn new(collection: &str) -> Self {
        Self::with_max_records(collection, IN_MEMORY_MAX_RECORDS)
    }

    pub fn with_max_records(collection: &str, max_records: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            collection: collection.to_string(),
            max_records: max_records.max(1),
        }
    }
}

impl ExperimentRecorder for InMemoryRecorder {
    fn record(&self, entry: ExperimentEntry) -> Result<ExperimentRecord, PersistenceError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        let record = ExperimentRecord::from_entry(format!("{:016x}", state.next_id), entry, Utc::now());
        state.next_id += 1;
        if state.records.len() >= self.max_records {
            state.records.pop_front();
        }
        state.records.push_back(record.clone());
        Ok(record)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ExperimentRecord>, PersistenceError> {
        let state = self
            .state
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        Ok(state.records.iter().rev().take(limit).cloned().collect())
    }

    fn count(&self) -> Result<usize, PersistenceError> {
        let state = self
            .state
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;
        Ok(state.records.len())
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordedValue;

    fn make_entry(crop: &str, score: f64) -> ExperimentEntry {
        ExperimentEntry {
            crop: crop.to_string(),
            rainfall: Some(RecordedValue::Band("high".to_string())),
            temperature: Some(RecordedValue::Band("medium".to_string())),
            ndvi: None,
            yield_score: score,
            advice: "test".to_string(),
        }
    }

    #[test]
    fn test_sled_record_and_list_order() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = SledRecorder::open(dir.path(), "simulations").unwrap();

        let first = recorder.record(make_entry("wheat", 70.0)).unwrap();
        let second = recorder.record(make_entry("rice", 55.0)).unwrap();
        recorder.record(make_entry("maize", 40.0)).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(recorder.count().unwrap(), 3);

        let recent = recorder.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].crop, "maize"); // most recent first
        assert_eq!(recent[1].crop, "rice");
    }

    #[test]
    fn test_sled_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let recorder = SledRecorder::open(dir.path(), "experimentations").unwrap();
            recorder.record(make_entry("wheat", 82.0)).unwrap();
        }
        let recorder = SledRecorder::open(dir.path(), "experimentations").unwrap();
        let recent = recorder.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].yield_score, 82.0);
        assert_eq!(recent[0].rainfall, Some(RecordedValue::Band("high".to_string())));
    }

    #[test]
    fn test_sled_collections_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        let sims = SledRecorder::open(dir.path().join("db"), "simulations").unwrap();
        sims.record(make_entry("wheat", 70.0)).unwrap();
        drop(sims);

        let exps = SledRecorder::open(dir.path().join("db"), "experimentations").unwrap();
        assert_eq!(exps.count().unwrap(), 0);
        assert_eq!(exps.collection(), "experimentations");
    }

    #[test]
    fn test_in_memory_assigns_ids_and_timestamps() {
        let recorder = InMemoryRecorder::new("simulations");
        let before = Utc::now();
        let record = recorder.record(make_entry("wheat", 70.0)).unwrap();
        assert!(record.timestamp >= before);
        assert_eq!(record.id, "0000000000000000");
        assert_eq!(recorder.count().unwrap(), 1);
    }

    #[test]
    fn test_sled_unreadable_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = SledRecorder::open(dir.path(), "simulations").unwrap();
        recorder.record(make_entry("wheat", 70.0)).unwrap();

        let key = recorder.db.generate_id().unwrap();
        recorder.tree.insert(key.to_be_bytes(), &b"not json"[..]).unwrap();
        assert_eq!(recorder.count().unwrap(), 2);

        let err = recorder.recent(10).unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization(_)), "{err:?}");
        assert!(err.to_string().contains(&format!("{key:016x}")));
    }

    #[test]
    fn test_in_memory_evicts_oldest_beyond_cap() {
        let recorder = InMemoryRecorder::with_max_records("simulations", 2);
        recorder.record(make_entry("wheat", 70.0)).unwrap();
        recorder.record(make_entry("rice", 55.0)).unwrap();
        let third = recorder.record(make_entry("maize", 40.0)).unwrap();

        assert_eq!(recorder.count().unwrap(), 2);
        assert_eq!(third.id, "0000000000000002", "ids keep increasing after eviction");
        let crops: Vec<_> = recorder
            .recent(10)
            .unwrap()
            .into_iter()
            .map(|r| r.crop)
            .collect();
        assert_eq!(crops, ["maize", "rice"]);
    }

    #[test]
    fn test_trait_object() {
        let recorder: Box<dyn ExperimentRecorder> = Box::new(InMemoryRecorder::new("simulations"));
        assert_eq!(recorder.backend_name(), "memory");
        recorder.record(make_entry("wheat", 70.0)).unwrap();
        assert_eq!(recorder.recent(10).unwrap().len(), 1);
    }
}
