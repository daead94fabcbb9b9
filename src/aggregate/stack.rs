//! The stack aggregate
//!
//! A `Stack` holds an ordered sequence of integers. Its state changes in two
//! phases: [`Stack::decide`] turns a kapp into the next event without
//! touching state, and [`Stack::apply`] folds an event into state. Live
//! execution and replay share `apply`, so a replayed stack always matches
//! the one that produced the events.

use uuid::Uuid;

use crate::error::{KappError, KappResult};
use crate::types::{EventKind, Kapp, PendingEvent, RecordedEvent};

/// Event-sourced stack of integers
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    id: Uuid,
    /// Number of events applied
    version: u64,
    items: Vec<i64>,
    /// Events decided and applied but not yet persisted
    pending: Vec<PendingEvent>,
}

impl Stack {
    /// Create a new, empty stack with a fresh identity
    pub fn create() -> Self {
        Self::create_with_id(Uuid::new_v4())
    }

    /// Create a new, empty stack with the given identity
    pub fn create_with_id(id: Uuid) -> Self {
        let mut stack = Self::blank(id);
        let event = stack.next_event(EventKind::Create);
        stack.commit(event);
        stack
    }

    fn blank(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            items: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Rebuild a stack by replaying its full history.
    ///
    /// The history must start with `create`, contain no other `create`, and
    /// carry sequence numbers `1..=n` in order.
    pub fn from_history(id: Uuid, events: &[RecordedEvent]) -> KappResult<Self> {
        let first = events.first().ok_or(KappError::NotFound(id))?;
        if first.kind != EventKind::Create {
            return Err(corrupt(id, format!("first event is {}, not create", first.kind)));
        }

        let mut stack = Self::blank(id);
        for event in events {
            if event.aggregate_id != id {
                return Err(corrupt(
                    id,
                    format!("event at position {} belongs to {}", event.position, event.aggregate_id),
                ));
            }
            if event.sequence != stack.version + 1 {
                return Err(corrupt(
                    id,
                    format!("expected sequence {}, found {}", stack.version + 1, event.sequence),
                ));
            }
            if event.kind == EventKind::Create && event.sequence != 1 {
                return Err(corrupt(id, format!("create repeated at sequence {}", event.sequence)));
            }
            stack.apply(event.kind);
        }

        Ok(stack)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &[i64] {
        &self.items
    }

    pub fn into_items(self) -> Vec<i64> {
        self.items
    }

    /// Decide the event that running `kapp` produces. Pure; state is not touched.
    pub fn decide(&self, kapp: Kapp) -> PendingEvent {
        self.next_event(kapp.into())
    }

    fn next_event(&self, kind: EventKind) -> PendingEvent {
        PendingEvent {
            aggregate_id: self.id,
            sequence: self.version + 1,
            kind,
            payload: None,
        }
    }

    /// Fold one event into the stack.
    ///
    /// Every kind is total: when a kapp's precondition fails (too few items)
    /// the items are left alone, but the version still advances.
    pub fn apply(&mut self, kind: EventKind) {
        let items = &mut self.items;
        match kind {
            EventKind::Create => items.clear(),
            EventKind::Pop => {
                items.pop();
            }
            EventKind::Dup => {
                if let Some(&top) = items.last() {
                    items.push(top);
                }
            }
            EventKind::Swap => {
                let len = items.len();
                if len >= 2 {
                    items.swap(len - 1, len - 2);
                }
            }
            EventKind::Zero => items.push(0),
            EventKind::Succ => {
                if let Some(top) = items.last_mut() {
                    *top = top.wrapping_add(1);
                }
            }
            EventKind::Pred => {
                if let Some(top) = items.last_mut() {
                    *top = top.wrapping_sub(1);
                }
            }
            EventKind::Add => binary(items, i64::wrapping_add),
            EventKind::Sub => binary(items, i64::wrapping_sub),
            EventKind::Mul => binary(items, i64::wrapping_mul),
            EventKind::Div => binary(items, floor_div),
        }
        self.version += 1;
    }

    /// Run a kapp: decide its event, apply it, and hold it until persisted.
    pub fn execute(&mut self, kapp: Kapp) -> &PendingEvent {
        let event = self.decide(kapp);
        self.commit(event)
    }

    /// Apply a decided event and hold it until persisted
    fn commit(&mut self, event: PendingEvent) -> &PendingEvent {
        self.apply(event.kind);
        self.pending.push(event);
        &self.pending[self.pending.len() - 1]
    }

    pub fn pending(&self) -> &[PendingEvent] {
        &self.pending
    }

    /// Drain the events that still need to be persisted
    pub fn take_pending(&mut self) -> Vec<PendingEvent> {
        std::mem::take(&mut self.pending)
    }
}

fn corrupt(aggregate_id: Uuid, reason: String) -> KappError {
    KappError::CorruptHistory {
        aggregate_id,
        reason,
    }
}

/// Pop `a` (the top), pop `b`, push `op(b, a)`. No-op with fewer than two items.
fn binary(items: &mut Vec<i64>, op: fn(i64, i64) -> i64) {
    if items.len() < 2 {
        return;
    }
    if let (Some(a), Some(b)) = (items.pop(), items.pop()) {
        items.push(op(b, a));
    }
}

/// Division rounding toward negative infinity; dividing by zero yields 0.
fn floor_div(b: i64, a: i64) -> i64 {
    if a == 0 {
        return 0;
    }
    let quotient = b.wrapping_div(a);
    if b.wrapping_rem(a) != 0 && ((b < 0) != (a < 0)) {
        quotient.wrapping_sub(1)
    } else {
        quotient
    }
}
