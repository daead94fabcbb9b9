//! JSON-lines event store
//!
//! Every event is one line of `events.jsonl`, appended and (optionally)
//! synced before the append is acknowledged. On open the whole file is
//! replayed into an in-memory index, which then serves all reads.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::types::{Appended, EventKind, RecordedEvent};

use super::memory::MemoryLog;
use super::store::{EventStore, EventStoreConfig, EventStoreError, EventStoreResult};

struct JsonlLog {
    index: MemoryLog,
    file: File,
    /// Set when a failed append could not be rolled back
    poisoned: bool,
}

impl JsonlLog {
    fn write_line(&mut self, line: &str, sync: bool) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        self.file.write_all(&bytes)?;
        if sync {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

/// Event store persisted as an append-only JSONL file
pub struct JsonlEventStore {
    config: EventStoreConfig,
    log: RwLock<JsonlLog>,
}

impl JsonlEventStore {
    /// Open (or create) the log under `config.data_dir`
    pub fn open(config: EventStoreConfig) -> EventStoreResult<Self> {
        let events_path = config.events_path();

        // Ensure parent directory exists
        if let Some(parent) = events_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let index = Self::load_index(&events_path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_path)?;

        info!(
            path = %events_path.display(),
            events = index.last_position(),
            stacks = index.aggregate_count(),
            "opened event log"
        );

        Ok(Self {
            config,
            log: RwLock::new(JsonlLog {
                index,
                file,
                poisoned: false,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &EventStoreConfig {
        &self.config
    }

    /// Number of aggregates with at least one event
    pub fn aggregate_count(&self) -> usize {
        self.log.read().index.aggregate_count()
    }

    /// Replay the file into an index, rejecting lines that break ordering.
    fn load_index(path: &Path) -> EventStoreResult<MemoryLog> {
        let mut index = MemoryLog::default();
        if !path.exists() {
            return Ok(index);
        }

        let reader = BufReader::new(File::open(path)?);
        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }

            let invalid = |reason: String| EventStoreError::InvalidEvent {
                line: line_num + 1,
                reason,
            };

            let event = RecordedEvent::from_json_line(&line).map_err(|e| invalid(e.to_string()))?;

            let expected_position = index.last_position() + 1;
            if event.position != expected_position {
                return Err(invalid(format!(
                    "expected position {}, found {}",
                    expected_position, event.position
                )));
            }

            let expected_sequence = index.version(event.aggregate_id) + 1;
            if event.sequence != expected_sequence {
                return Err(invalid(format!(
                    "expected sequence {} for {}, found {}",
                    expected_sequence, event.aggregate_id, event.sequence
                )));
            }

            index.insert(event);
        }

        Ok(index)
    }
}

impl EventStore for JsonlEventStore {
    fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: u64,
        kind: EventKind,
        payload: Option<serde_json::Value>,
    ) -> EventStoreResult<Appended> {
        let mut log = self.log.write();
        if log.poisoned {
            return Err(EventStoreError::Poisoned);
        }
        let event = log
            .index
            .next_event(aggregate_id, expected_version, kind, payload)?;

        let json_line = event.to_json_line()?;
        let committed_len = log.file.metadata()?.len();
        if let Err(e) = log.write_line(&json_line, self.config.sync_on_append) {
            // The file must end at the last indexed event, or the next open rejects it
            match log.file.set_len(committed_len) {
                Ok(()) => warn!(position = event.position, error = %e, "append failed, log rolled back"),
                Err(truncate_err) => {
                    log.poisoned = true;
                    error!(
                        position = event.position,
                        error = %e,
                        truncate_error = %truncate_err,
                        "append failed and could not be rolled back; refusing further appends"
                    );
                }
            }
            return Err(e.into());
        }

        let appended = log.index.insert(event);
        debug!(
            aggregate = %aggregate_id,
            version = appended.version,
            position = appended.position,
            kind = %kind,
            "appended event"
        );
        Ok(appended)
    }

    fn load_events(&self, aggregate_id: Uuid) -> EventStoreResult<Vec<RecordedEvent>> {
        Ok(self.log.read().index.load(aggregate_id))
    }

    fn read_from(&self, position: u64, limit: usize) -> EventStoreResult<Vec<RecordedEvent>> {
        Ok(self.log.read().index.read_from(position, limit))
    }

    fn last_position(&self) -> EventStoreResult<u64> {
        Ok(self.log.read().index.last_position())
    }

    fn version(&self, aggregate_id: Uuid) -> EventStoreResult<u64> {
        Ok(self.log.read().index.version(aggregate_id))
    }
}
