//! Event Store Module for Event Sourcing
//!
//! This module provides the storage side of event sourcing:
//! - `EventStore`: append-if-version-matches, per-stack loads and ordered scans
//! - `InMemoryEventStore`: process-local store
//! - `JsonlEventStore`: append-only `events.jsonl` on disk
//! - `NotificationLogReader`: lazy cursor over the global event order
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌──────────┐    ┌────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ dispatch │───►│ load +     │───►│ decide +     │───►│ append if    │
//! │ (kapp)   │    │ replay     │    │ apply event  │    │ version same │
//! └──────────┘    └────────────┘    └──────────────┘    └──────────────┘
//!
//! Read Path (audit / counts):
//! ┌──────────────┐    ┌──────────────────┐
//! │ read(start)  │───►│ read_from(pos, n)│───► sections in position order
//! └──────────────┘    └──────────────────┘
//! ```

mod jsonl;
mod memory;
mod notification_log;
mod store;

pub use jsonl::JsonlEventStore;
pub use memory::InMemoryEventStore;
pub use notification_log::{NotificationLogReader, Notifications, DEFAULT_SECTION_SIZE};
pub use store::{EventStore, EventStoreConfig, EventStoreError, EventStoreResult};
