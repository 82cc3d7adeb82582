//! Flat runtime configuration with per-subsystem defaults.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::dlq::DeadLetterQueueOptions;
use crate::logging::ActorLoggingOptions;
use crate::mailbox::AdaptiveMailboxOptions;
use crate::protection::{CircuitBreakerOptions, RateLimitOptions};

/// Default capacity for fixed-size mailboxes created by the runtime.
pub const DEFAULT_RUNTIME_MAILBOX_CAPACITY: usize = 1000;

/// Aggregate configuration for one silo's runtime.
///
/// Every field is optional in serialized form and defaults per its
/// subsystem; an empty config is a fully working runtime.
///
/// # Example
/// ```rust
/// use granary_rt::system::RuntimeConfig;
///
/// let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
/// assert_eq!(config.default_mailbox_capacity, 1000);
/// assert!(!config.circuit_breaker.enabled);
/// assert!(!config.rate_limit.enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of non-adaptive mailboxes
    #[serde(
        skip_serializing_if = "is_default_capacity",
        default = "default_capacity"
    )]
    pub default_mailbox_capacity: usize,

    /// Dead-letter capture and retry policy
    pub dead_letter_queue: DeadLetterQueueOptions,

    /// Log scopes and sampling
    pub logging: ActorLoggingOptions,

    /// Adaptive-capacity mailbox parameters
    pub adaptive_mailbox: AdaptiveMailboxOptions,

    /// Per-actor-type circuit breaker
    pub circuit_breaker: CircuitBreakerOptions,

    /// Inbound rate limit
    pub rate_limit: RateLimitOptions,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_mailbox_capacity: DEFAULT_RUNTIME_MAILBOX_CAPACITY,
            dead_letter_queue: DeadLetterQueueOptions::default(),
            logging: ActorLoggingOptions::default(),
            adaptive_mailbox: AdaptiveMailboxOptions::default(),
            circuit_breaker: CircuitBreakerOptions::default(),
            rate_limit: RateLimitOptions::default(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_RUNTIME_MAILBOX_CAPACITY
}

fn is_default_capacity(value: &usize) -> bool {
    *value == DEFAULT_RUNTIME_MAILBOX_CAPACITY
}
