//! Event types for Event Sourcing
//!
//! Events are immutable records of stack operations. A stack's items are
//! never stored; they are rebuilt by replaying its events in sequence order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Kapp;

/// Kinds of event that can occur on a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new, empty stack was created
    Create,
    Pop,
    Dup,
    Swap,
    Zero,
    Succ,
    Pred,
    Add,
    Sub,
    Mul,
    Div,
}

impl EventKind {
    /// Name reported in the notification log
    pub fn as_str(self) -> &'static str {
        match self.kapp() {
            Some(kapp) => kapp.as_str(),
            None => "create",
        }
    }

    /// The kapp this event records, or `None` for `create`
    pub fn kapp(self) -> Option<Kapp> {
        match self {
            EventKind::Create => None,
            EventKind::Pop => Some(Kapp::Pop),
            EventKind::Dup => Some(Kapp::Dup),
            EventKind::Swap => Some(Kapp::Swap),
            EventKind::Zero => Some(Kapp::Zero),
            EventKind::Succ => Some(Kapp::Succ),
            EventKind::Pred => Some(Kapp::Pred),
            EventKind::Add => Some(Kapp::Add),
            EventKind::Sub => Some(Kapp::Sub),
            EventKind::Mul => Some(Kapp::Mul),
            EventKind::Div => Some(Kapp::Div),
        }
    }
}

impl From<Kapp> for EventKind {
    fn from(kapp: Kapp) -> Self {
        match kapp {
            Kapp::Pop => EventKind::Pop,
            Kapp::Dup => EventKind::Dup,
            Kapp::Swap => EventKind::Swap,
            Kapp::Zero => EventKind::Zero,
            Kapp::Succ => EventKind::Succ,
            Kapp::Pred => EventKind::Pred,
            Kapp::Add => EventKind::Add,
            Kapp::Sub => EventKind::Sub,
            Kapp::Mul => EventKind::Mul,
            Kapp::Div => EventKind::Div,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event decided by an aggregate but not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub aggregate_id: Uuid,
    /// Sequence number the event will take in its aggregate's history
    pub sequence: u64,
    pub kind: EventKind,
    pub payload: Option<serde_json::Value>,
}

/// An immutable event in the event log
///
/// Events are the source of truth. The current state of every stack is
/// derived by replaying its events in `sequence` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Stack the event belongs to
    #[serde(rename = "aggregateId")]
    pub aggregate_id: Uuid,

    /// Per-aggregate sequence number, starting at 1 with no gaps
    pub sequence: u64,

    pub kind: EventKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    /// Global position across all aggregates, starting at 1
    pub position: u64,

    #[serde(rename = "recordedAt")]
    pub recorded_at: DateTime<Utc>,
}

impl RecordedEvent {
    /// Serialize event to JSON string (for JSONL)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Result of a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    /// Aggregate version after the append (the event's sequence number)
    pub version: u64,
    /// Global position assigned to the event
    pub position: u64,
}

/// One line of the audit trail returned by `get_event_log`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub position: u64,
    #[serde(rename = "aggregateId")]
    pub aggregate_id: Uuid,
    pub version: u64,
    pub kind: String,
}

impl From<&RecordedEvent> for LogEntry {
    fn from(event: &RecordedEvent) -> Self {
        Self {
            position: event.position,
            aggregate_id: event.aggregate_id,
            version: event.sequence,
            kind: event.kind.as_str().to_string(),
        }
    }
}
