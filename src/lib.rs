//! Kapplang
//!
//! An event-sourced stack machine. A stack's items are never stored: every
//! operation ("kapp") appends one immutable event, and the current items are
//! rebuilt by replaying those events in order.
//!
//! # Modules
//!
//! - `types`: kapps, events and log entries
//! - `aggregate`: the `Stack` aggregate (decide + apply)
//! - `event_store`: storage boundary, in-memory and JSONL stores, notification log
//! - `app`: the application service and its dispatch gate
//! - `console`: line-oriented driver used by the `kapplang` binary
//!
//! # Example
//!
//! ```
//! use kapplang::event_store::InMemoryEventStore;
//! use kapplang::KapplangApp;
//!
//! let app = KapplangApp::new(InMemoryEventStore::new());
//! let stack_id = app.create_stack().unwrap();
//!
//! for kapp in app.push_int(6).unwrap().into_iter().chain(app.push_int(2).unwrap()) {
//!     app.dispatch(stack_id, kapp).unwrap();
//! }
//! app.dispatch(stack_id, "div").unwrap();
//!
//! assert_eq!(app.get_stack(stack_id).unwrap(), vec![3]);
//! ```

pub mod aggregate;
pub mod app;
pub mod console;
pub mod error;
pub mod event_store;
pub mod types;

// Re-export commonly used items at crate root
pub use aggregate::Stack;
pub use app::{DispatchGate, KapplangApp, MAX_LITERAL};
pub use error::{KappError, KappResult};
pub use types::{EventKind, Kapp, LogEntry, RecordedEvent, GROUNDED_KAPPS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
