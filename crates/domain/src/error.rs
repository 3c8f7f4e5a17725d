//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HomeError`]
//! via `From` when crossing a port boundary.

/// Workspace-wide error.
#[derive(Debug, thiserror::Error)]
pub enum HomeError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The relational store failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The publish/subscribe transport failed.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An external actuator (lights, speaker, webhook) failed.
    #[error("actuator error")]
    Actuator(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations, mostly raised while loading definitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("unknown comparator {0:?}")]
    UnknownComparator(String),

    #[error("unknown condition kind {0:?}")]
    UnknownConditionKind(String),

    #[error("unknown command kind {0:?}")]
    UnknownCommandKind(String),

    #[error("unknown node level {0:?}")]
    UnknownLevel(String),

    #[error("invalid threshold {value:?} for {kind} condition")]
    InvalidThreshold { kind: &'static str, value: String },

    #[error("invalid clock time {0:?}, expected HH:MM")]
    InvalidClockTime(String),

    #[error("selector must not be empty")]
    EmptySelector,

    #[error("rule has no primary command")]
    MissingPrimaryCommand,

    #[error("node {node} references unknown parent {parent}")]
    OrphanNode { node: String, parent: String },

    #[error("{child} level node cannot be a child of {parent} level node")]
    InvalidNesting {
        parent: &'static str,
        child: &'static str,
    },
}

/// A lookup that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
