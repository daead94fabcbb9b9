//! Errors surfaced by the application service

use thiserror::Error;
use uuid::Uuid;

use crate::event_store::EventStoreError;

/// Result type for application operations
pub type KappResult<T> = Result<T, KappError>;

/// Errors returned to callers of [`KapplangApp`](crate::KapplangApp)
///
/// Stack underflow and division by zero are not errors: those kapps are
/// recorded as no-ops (or push 0) like any other dispatch.
#[derive(Debug, Error)]
pub enum KappError {
    /// The name is not in the dispatch vocabulary.
    #[error("kapp {0} not grounded")]
    UngroundedOperation(String),

    /// The name is in the vocabulary but no stack operation exists for it.
    #[error("kapp {0} implementation not found")]
    OperationNotImplemented(String),

    #[error("stack {0} not found")]
    NotFound(Uuid),

    /// `push_int` would need more than `max` succ/pred kapps.
    #[error("literal {value} out of range (magnitude at most {max})")]
    LiteralOutOfRange { value: i64, max: u64 },

    /// Another writer advanced the stack since it was loaded. Reload and retry.
    #[error("concurrency conflict on stack {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        aggregate_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("corrupt history for stack {aggregate_id}: {reason}")]
    CorruptHistory { aggregate_id: Uuid, reason: String },

    #[error(transparent)]
    Store(EventStoreError),
}

impl KappError {
    /// Whether reloading the stack and dispatching again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, KappError::ConcurrencyConflict { .. })
    }
}

impl From<EventStoreError> for KappError {
    fn from(e: EventStoreError) -> Self {
        match e {
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => KappError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            },
            other => KappError::Store(other),
        }
    }
}
