//! The kapp vocabulary
//!
//! A kapp is a named stack operation. The set of kapps that may be
//! dispatched is closed: it is fixed at compile time by [`GROUNDED_KAPPS`]
//! and by the variants of [`Kapp`].

use std::fmt;
use std::iter;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Names of the kapps that may be dispatched against a stack.
pub const GROUNDED_KAPPS: &[&str] = &[
    "pop", "dup", "swap", "zero", "succ", "pred", "add", "sub", "mul", "div",
];

/// A primitive stack operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kapp {
    /// Remove the top item
    Pop,
    /// Duplicate the top item
    Dup,
    /// Exchange the top two items
    Swap,
    /// Push 0
    Zero,
    /// Increment the top item
    Succ,
    /// Decrement the top item
    Pred,
    /// Replace the top two items `b a` with `b + a`
    Add,
    /// Replace the top two items `b a` with `b - a`
    Sub,
    /// Replace the top two items `b a` with `b * a`
    Mul,
    /// Replace the top two items `b a` with `floor(b / a)`, or 0 when `a == 0`
    Div,
}

impl Kapp {
    /// Every kapp, in vocabulary order
    pub const ALL: [Kapp; 10] = [
        Kapp::Pop,
        Kapp::Dup,
        Kapp::Swap,
        Kapp::Zero,
        Kapp::Succ,
        Kapp::Pred,
        Kapp::Add,
        Kapp::Sub,
        Kapp::Mul,
        Kapp::Div,
    ];

    /// The name a kapp is dispatched and logged under
    pub fn as_str(self) -> &'static str {
        match self {
            Kapp::Pop => "pop",
            Kapp::Dup => "dup",
            Kapp::Swap => "swap",
            Kapp::Zero => "zero",
            Kapp::Succ => "succ",
            Kapp::Pred => "pred",
            Kapp::Add => "add",
            Kapp::Sub => "sub",
            Kapp::Mul => "mul",
            Kapp::Div => "div",
        }
    }

    /// Look up a kapp by name
    pub fn from_name(name: &str) -> Option<Kapp> {
        Self::ALL.iter().copied().find(|kapp| kapp.as_str() == name)
    }

    /// The kapps that build the integer `value` on top of a stack.
    ///
    /// `zero` followed by `|value|` repetitions of `succ` (positive) or
    /// `pred` (negative). Lazy, so any `i64` is accepted.
    pub fn literal(value: i64) -> impl Iterator<Item = Kapp> {
        let step = if value < 0 { Kapp::Pred } else { Kapp::Succ };
        let count = usize::try_from(value.unsigned_abs()).unwrap_or(usize::MAX);

        iter::once(Kapp::Zero).chain(iter::repeat(step).take(count))
    }
}

impl fmt::Display for Kapp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a name that is not a kapp
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kapp: {0}")]
pub struct UnknownKapp(pub String);

impl FromStr for Kapp {
    type Err = UnknownKapp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kapp::from_name(s).ok_or_else(|| UnknownKapp(s.to_string()))
    }
}
