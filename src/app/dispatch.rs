//! Dispatch gate
//!
//! Every kapp name passes through the gate before a stack is touched. A name
//! must be grounded (listed in the vocabulary) and must resolve to a stack
//! operation.

use crate::error::{KappError, KappResult};
use crate::types::{Kapp, GROUNDED_KAPPS};

/// Allow-list check plus name-to-operation resolution
#[derive(Debug, Clone, Copy)]
pub struct DispatchGate {
    vocabulary: &'static [&'static str],
}

impl Default for DispatchGate {
    fn default() -> Self {
        Self::new(GROUNDED_KAPPS)
    }
}

impl DispatchGate {
    pub(crate) fn new(vocabulary: &'static [&'static str]) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &'static [&'static str] {
        self.vocabulary
    }

    pub fn is_grounded(&self, name: &str) -> bool {
        self.vocabulary.contains(&name)
    }

    /// Resolve a kapp name to the operation it dispatches to
    pub fn resolve(&self, name: &str) -> KappResult<Kapp> {
        if !self.is_grounded(name) {
            return Err(KappError::UngroundedOperation(name.to_string()));
        }
        Kapp::from_name(name).ok_or_else(|| KappError::OperationNotImplemented(name.to_string()))
    }
}
