//! Constraints module
//!
//! Named boolean flags kept consistent under declared relationship rules
//! (exclusion, at-least-one, radio groups, implication, master switches,
//! change effects and locks), plus the rule tables of the toggle nodes.

mod engine;
pub mod presets;
mod rules;

pub use engine::{
    ConstraintSet, FlagChange, LockChange, Resolution, SharedConstraintSet, ToggleNode,
};
pub use rules::{Edge, Effect, Fallback, Rule};

use thiserror::Error;

/// Errors raised while building or resolving a constraint set.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// A rule or toggle refers to a flag that does not exist.
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),
    /// Two flags share a name.
    #[error("flag '{0}' is declared twice")]
    DuplicateFlag(String),
    /// A group rule has no members.
    #[error("rule {rule} has an empty member list")]
    EmptyGroup { rule: usize },
    /// A rule is internally inconsistent.
    #[error("rule {rule} is malformed: {reason}")]
    MalformedRule { rule: usize, reason: &'static str },
    /// The flag is read-only in the current state.
    #[error("flag '{0}' is locked")]
    Locked(String),
    /// The rules could not be satisfied; nothing was changed.
    #[error("{kind} rule {rule} still violated after resolution")]
    Unresolved { rule: usize, kind: &'static str },
}
