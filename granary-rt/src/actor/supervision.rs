//! Supervision directives for parent/child actor hierarchies.
//!
//! A parent referencing children holds identities, never activation
//! pointers; lifetime stays with the factory. When a child's method
//! processing fails, the runtime asks the parent for a directive.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
use crate::util::ActorIdentity;

/// What the runtime does with a failed child.
///
/// The default for a child with no custom supervisor is [`Restart`].
/// `Escalate` forwards the failure to the next ancestor.
///
/// [`Restart`]: SupervisionDirective::Restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisionDirective {
    /// Deactivate and re-activate the child, keeping its identity.
    #[default]
    Restart,

    /// Deactivate the child and leave it stopped.
    Stop,

    /// Hand the failure to the parent's own supervisor.
    Escalate,

    /// Leave the child running and continue with the next message.
    Resume,
}

impl fmt::Display for SupervisionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restart => write!(f, "Restart"),
            Self::Stop => write!(f, "Stop"),
            Self::Escalate => write!(f, "Escalate"),
            Self::Resume => write!(f, "Resume"),
        }
    }
}

/// Context handed to `on_child_failure`.
#[derive(Debug, Clone)]
pub struct ChildFailureContext {
    /// Identity of the failed child
    pub child: ActorIdentity,

    /// Rendered failure reason
    pub error: String,

    /// How many times this child has failed since activation
    pub failure_count: u32,

    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
}

impl ChildFailureContext {
    /// Record a child failure observed now.
    pub fn new(child: ActorIdentity, error: impl Into<String>, failure_count: u32) -> Self {
        Self {
            child,
            error: error.into(),
            failure_count,
            timestamp: Utc::now(),
        }
    }
}
