//! Application service
//!
//! `KapplangApp` is the only writer path. Every call reloads the stack it
//! touches from the event store, so the service holds no state between
//! calls and can be shared across threads behind an `Arc`.

mod dispatch;

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::aggregate::Stack;
use crate::error::{KappError, KappResult};
use crate::event_store::{EventStore, NotificationLogReader};
use crate::types::{Kapp, LogEntry};

pub use dispatch::DispatchGate;

/// Largest magnitude `push_int` will spell out as succ/pred kapps
pub const MAX_LITERAL: u64 = 1_000_000;

/// Stack machine driven by an append-only event log
pub struct KapplangApp<S: EventStore> {
    store: S,
    gate: DispatchGate,
}

impl<S: EventStore> KapplangApp<S> {
    /// Create an app over the given event store
    pub fn new(store: S) -> Self {
        Self {
            store,
            gate: DispatchGate::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_gate(store: S, gate: DispatchGate) -> Self {
        Self { store, gate }
    }

    /// Get the underlying event store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the dispatch gate
    pub fn gate(&self) -> &DispatchGate {
        &self.gate
    }

    /// Create an empty stack and return its identity
    pub fn create_stack(&self) -> KappResult<Uuid> {
        let mut stack = Stack::create();
        self.save(&mut stack)?;

        debug!(stack = %stack.id(), "created stack");
        Ok(stack.id())
    }

    /// The kapp names that push `value` onto a stack. Pure.
    ///
    /// Values beyond [`MAX_LITERAL`] in magnitude are refused rather than
    /// expanded.
    pub fn push_int(&self, value: i64) -> KappResult<Vec<&'static str>> {
        if value.unsigned_abs() > MAX_LITERAL {
            return Err(KappError::LiteralOutOfRange {
                value,
                max: MAX_LITERAL,
            });
        }
        Ok(Kapp::literal(value).map(Kapp::as_str).collect())
    }

    /// Current items of a stack, rebuilt from its events
    pub fn get_stack(&self, stack_id: Uuid) -> KappResult<Vec<i64>> {
        Ok(self.load(stack_id)?.into_items())
    }

    /// Run one kapp on a stack and persist the resulting event.
    ///
    /// Returns the stack's new version. Nothing is appended when the name is
    /// rejected by the gate or when another writer advanced the stack first.
    pub fn dispatch(&self, stack_id: Uuid, kapp_name: &str) -> KappResult<u64> {
        let mut stack = self.load(stack_id)?;

        let kapp = self.gate.resolve(kapp_name).map_err(|e| {
            warn!(stack = %stack_id, kapp = kapp_name, error = %e, "rejected dispatch");
            e
        })?;

        stack.execute(kapp);
        self.save(&mut stack)?;
        Ok(stack.version())
    }

    /// Dispatch each name in order, stopping at the first error
    pub fn dispatch_all<I, N>(&self, stack_id: Uuid, kapp_names: I) -> KappResult<u64>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mut version = self.store.version(stack_id)?;
        if version == 0 {
            return Err(KappError::NotFound(stack_id));
        }
        for name in kapp_names {
            version = self.dispatch(stack_id, name.as_ref())?;
        }
        Ok(version)
    }

    /// Push an integer literal onto a stack
    pub fn push(&self, stack_id: Uuid, value: i64) -> KappResult<u64> {
        self.dispatch_all(stack_id, self.push_int(value)?)
    }

    /// Audit trail of every event at or after global position `start`
    pub fn get_event_log(&self, start: u64) -> KappResult<Vec<LogEntry>> {
        let reader = NotificationLogReader::new(&self.store);
        let mut entries = Vec::new();
        for event in reader.read(start)? {
            entries.push(LogEntry::from(&event?));
        }
        Ok(entries)
    }

    /// How often each grounded kapp occurs at or after global position `start`.
    ///
    /// `create` events are not kapps and are never counted.
    pub fn get_kapp_counts(&self, start: u64) -> KappResult<HashMap<String, usize>> {
        let reader = NotificationLogReader::new(&self.store);
        let mut kapp_counts = HashMap::new();
        for event in reader.read(start)? {
            let kind = event?.kind;
            if self.gate.is_grounded(kind.as_str()) {
                *kapp_counts.entry(kind.as_str().to_string()).or_insert(0) += 1;
            }
        }
        Ok(kapp_counts)
    }

    fn load(&self, stack_id: Uuid) -> KappResult<Stack> {
        let events = self.store.load_events(stack_id)?;
        Stack::from_history(stack_id, &events)
    }

    /// Persist a stack's pending events, each against the version it was decided at
    fn save(&self, stack: &mut Stack) -> KappResult<()> {
        for event in stack.take_pending() {
            let expected_version = event.sequence - 1;
            self.store
                .append(event.aggregate_id, expected_version, event.kind, event.payload)
                .map_err(|e| {
                    let e = KappError::from(e);
                    if e.is_retryable() {
                        warn!(stack = %event.aggregate_id, error = %e, "concurrency conflict");
                    }
                    e
                })?;
        }
        Ok(())
    }
}
