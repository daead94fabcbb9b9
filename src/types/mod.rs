//! Data types for the kapp engine
//!
//! Kapps, events and the records handed back to callers.

mod event;
mod kapp;

pub use event::{Appended, EventKind, LogEntry, PendingEvent, RecordedEvent};
pub use kapp::{Kapp, UnknownKapp, GROUNDED_KAPPS};
