//! In-memory event store
//!
//! Keeps the whole log in a vector guarded by a `parking_lot::RwLock`. The
//! same `MemoryLog` also serves as the read index of the JSONL store.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::types::{Appended, EventKind, RecordedEvent};

use super::store::{EventStore, EventStoreError, EventStoreResult};

/// Ordered events plus a per-aggregate index into them
#[derive(Debug, Default)]
pub(crate) struct MemoryLog {
    /// Event at index `i` has global position `i + 1`
    events: Vec<RecordedEvent>,
    streams: HashMap<Uuid, Vec<usize>>,
}

impl MemoryLog {
    pub(crate) fn version(&self, aggregate_id: Uuid) -> u64 {
        self.streams
            .get(&aggregate_id)
            .map(|indexes| indexes.len() as u64)
            .unwrap_or(0)
    }

    /// Build the next event for an aggregate, checking its version first
    pub(crate) fn next_event(
        &self,
        aggregate_id: Uuid,
        expected_version: u64,
        kind: EventKind,
        payload: Option<serde_json::Value>,
    ) -> EventStoreResult<RecordedEvent> {
        let actual = self.version(aggregate_id);
        if actual != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        Ok(RecordedEvent {
            aggregate_id,
            sequence: expected_version + 1,
            kind,
            payload,
            position: self.last_position() + 1,
            recorded_at: Utc::now(),
        })
    }

    /// Add an event whose sequence and position are already validated
    pub(crate) fn insert(&mut self, event: RecordedEvent) -> Appended {
        let appended = Appended {
            version: event.sequence,
            position: event.position,
        };
        self.streams
            .entry(event.aggregate_id)
            .or_default()
            .push(self.events.len());
        self.events.push(event);
        appended
    }

    pub(crate) fn load(&self, aggregate_id: Uuid) -> Vec<RecordedEvent> {
        self.streams
            .get(&aggregate_id)
            .map(|indexes| indexes.iter().map(|&i| self.events[i].clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn read_from(&self, position: u64, limit: usize) -> Vec<RecordedEvent> {
        let start = usize::try_from(position.saturating_sub(1)).unwrap_or(usize::MAX);
        self.events
            .iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect()
    }

    pub(crate) fn last_position(&self) -> u64 {
        self.events.len() as u64
    }

    pub(crate) fn aggregate_count(&self) -> usize {
        self.streams.len()
    }
}

/// Event store that lives only as long as the process
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: RwLock<MemoryLog>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of aggregates with at least one event
    pub fn aggregate_count(&self) -> usize {
        self.log.read().aggregate_count()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: u64,
        kind: EventKind,
        payload: Option<serde_json::Value>,
    ) -> EventStoreResult<Appended> {
        let mut log = self.log.write();
        let event = log.next_event(aggregate_id, expected_version, kind, payload)?;
        let appended = log.insert(event);

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
        Ok(self.log.read().load(aggregate_id))
    }

    fn read_from(&self, position: u64, limit: usize) -> EventStoreResult<Vec<RecordedEvent>> {
        Ok(self.log.read().read_from(position, limit))
    }

    fn last_position(&self) -> EventStoreResult<u64> {
        Ok(self.log.read().last_position())
    }

    fn version(&self, aggregate_id: Uuid) -> EventStoreResult<u64> {
        Ok(self.log.read().version(aggregate_id))
    }
}
