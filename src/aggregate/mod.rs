//! Event-sourced aggregates
//!
//! Aggregates never store their state directly. A [`Stack`] is rebuilt from
//! its event history on every load and changes only by applying events.

mod stack;

pub use stack::Stack;
