//! Event Store - storage boundary for event sourcing
//!
//! The `EventStore` trait is the only way events reach durable storage.
//! Implementations must assign per-aggregate sequence numbers and global
//! positions atomically with the version check in [`EventStore::append`].

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::types::{Appended, EventKind, RecordedEvent};

/// Configuration for the file-backed event store
#[derive(Debug, Clone)]
pub struct EventStoreConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
    /// Whether to fsync the log after every appended event
    pub sync_on_append: bool,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sync_on_append: true,
        }
    }
}

impl EventStoreConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Create config with custom data directory (alias for new)
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self::new(data_dir)
    }

    /// Enable or disable fsync after each append
    pub fn with_sync(mut self, sync_on_append: bool) -> Self {
        self.sync_on_append = sync_on_append;
        self
    }

    /// Build config from `KAPPLANG_DATA_DIR` and `KAPPLANG_SYNC`.
    ///
    /// A relative data directory is resolved against the current directory.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let data_dir = env::var("KAPPLANG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config.data_dir.clone());
        config.data_dir = if data_dir.is_absolute() {
            data_dir
        } else {
            current_dir.join(data_dir)
        };

        if let Ok(sync) = env::var("KAPPLANG_SYNC") {
            config.sync_on_append = parse_flag(&sync);
        }

        config
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get path to events.jsonl
    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join("events.jsonl")
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Result type for EventStore operations
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Errors that can occur in EventStore operations
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The aggregate's version changed between load and append.
    #[error("aggregate {aggregate_id} is at version {actual}, expected {expected}")]
    ConcurrencyConflict {
        aggregate_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("invalid event at line {line}: {reason}")]
    InvalidEvent { line: usize, reason: String },

    /// A failed write left the log in an unknown state. Reopen to recover.
    #[error("event log refused further appends after a failed write")]
    Poisoned,
}

/// Append-only, globally ordered event storage
pub trait EventStore: Send + Sync {
    /// Append one event if the aggregate is still at `expected_version`.
    ///
    /// The event takes sequence `expected_version + 1` and the next global
    /// position. Fails with `ConcurrencyConflict` when another writer got
    /// there first; nothing is written in that case.
    fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: u64,
        kind: EventKind,
        payload: Option<serde_json::Value>,
    ) -> EventStoreResult<Appended>;

    /// All events of one aggregate, in sequence order
    fn load_events(&self, aggregate_id: Uuid) -> EventStoreResult<Vec<RecordedEvent>>;

    /// Up to `limit` events at or after global `position`, in position order
    fn read_from(&self, position: u64, limit: usize) -> EventStoreResult<Vec<RecordedEvent>>;

    /// Position of the most recent event, or 0 if the log is empty
    fn last_position(&self) -> EventStoreResult<u64>;

    /// Current version of an aggregate, or 0 if it has no events
    fn version(&self, aggregate_id: Uuid) -> EventStoreResult<u64> {
        Ok(self
            .load_events(aggregate_id)?
            .last()
            .map(|e| e.sequence)
            .unwrap_or(0))
    }
}

impl<S: EventStore + ?Sized> EventStore for std::sync::Arc<S> {
    fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: u64,
        kind: EventKind,
        payload: Option<serde_json::Value>,
    ) -> EventStoreResult<Appended> {
        (**self).append(aggregate_id, expected_version, kind, payload)
    }

    fn load_events(&self, aggregate_id: Uuid) -> EventStoreResult<Vec<RecordedEvent>> {
        (**self).load_events(aggregate_id)
    }

    fn read_from(&self, position: u64, limit: usize) -> EventStoreResult<Vec<RecordedEvent>> {
        (**self).read_from(position, limit)
    }

    fn last_position(&self) -> EventStoreResult<u64> {
        (**self).last_position()
    }

    fn version(&self, aggregate_id: Uuid) -> EventStoreResult<u64> {
        (**self).version(aggregate_id)
    }
}
