// Layer 1: Standard library imports
use std::collections::HashMap;
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Default bound on retained dead-letter entries per actor type.
pub const DEFAULT_DLQ_MAX_MESSAGES: usize = 1000;

/// Retry schedule applied to failed actor methods before dead-lettering.
///
/// `delay_for(attempt)` grows geometrically from `initial_delay` by
/// `backoff_multiplier` per prior attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total delivery attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Multiplier applied per additional retry
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Whether a message on its given attempt (0-based) has retries left.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Delay before redelivering a message that failed on `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        self.initial_delay.mul_f64(factor.max(0.0))
    }
}

/// Per-actor-type overrides. Unset fields inherit the global default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorTypeDlqConfig {
    /// Override for whether dead-lettering is enabled
    pub enabled: Option<bool>,

    /// Override for the entry bound
    pub max_messages: Option<usize>,

    /// Override for stack-trace capture
    pub capture_stack_traces: Option<bool>,

    /// Override for the retry policy
    pub retry_policy: Option<RetryPolicy>,
}

/// Global dead-letter configuration plus per-type overrides.
///
/// # Example
/// ```rust
/// use granary_rt::dlq::{ActorTypeDlqConfig, DeadLetterQueueOptions};
///
/// let mut options = DeadLetterQueueOptions::default();
/// options.actor_type_configurations.insert(
///     "OrderActor".to_owned(),
///     ActorTypeDlqConfig {
///         max_messages: Some(50),
///         ..Default::default()
///     },
/// );
///
/// let effective = options.effective_for("OrderActor");
/// assert_eq!(effective.max_messages, 50);
/// assert!(effective.enabled); // inherited from the global default
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterQueueOptions {
    /// Whether dead-lettering is on by default
    pub enabled: bool,

    /// Default entry bound per actor type
    pub max_messages: usize,

    /// Whether failure stack traces are captured by default
    pub capture_stack_traces: bool,

    /// Retry policy applied before dead-lettering, if any
    pub global_retry_policy: Option<RetryPolicy>,

    /// Per-actor-type overrides, keyed by type name
    pub actor_type_configurations: HashMap<String, ActorTypeDlqConfig>,
}

impl Default for DeadLetterQueueOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages: DEFAULT_DLQ_MAX_MESSAGES,
            capture_stack_traces: false,
            global_retry_policy: None,
            actor_type_configurations: HashMap::new(),
        }
    }
}

/// Fully-resolved configuration for one actor type.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveDlqConfig {
    pub enabled: bool,
    pub max_messages: usize,
    pub capture_stack_traces: bool,
    pub retry_policy: Option<RetryPolicy>,
}

impl DeadLetterQueueOptions {
    /// Resolve the effective configuration for one actor type: each field
    /// the per-type entry supplies overrides the global default; unset
    /// fields inherit.
    pub fn effective_for(&self, actor_type: &str) -> EffectiveDlqConfig {
        let overrides = self.actor_type_configurations.get(actor_type);
        EffectiveDlqConfig {
            enabled: overrides
                .and_then(|o| o.enabled)
                .unwrap_or(self.enabled),
            max_messages: overrides
                .and_then(|o| o.max_messages)
                .unwrap_or(self.max_messages),
            capture_stack_traces: overrides
                .and_then(|o| o.capture_stack_traces)
                .unwrap_or(self.capture_stack_traces),
            retry_policy: overrides
                .and_then(|o| o.retry_policy.clone())
                .or_else(|| self.global_retry_policy.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DeadLetterQueueOptions::default();
        assert!(options.enabled);
        assert_eq!(options.max_messages, DEFAULT_DLQ_MAX_MESSAGES);
        assert!(!options.capture_stack_traces);
        assert!(options.global_retry_policy.is_none());
    }

    #[test]
    fn test_effective_without_overrides_is_global() {
        let options = DeadLetterQueueOptions::default();
        let effective = options.effective_for("Anything");
        assert!(effective.enabled);
        assert_eq!(effective.max_messages, DEFAULT_DLQ_MAX_MESSAGES);
    }

    #[test]
    fn test_partial_override_inherits_unset_fields() {
        let mut options = DeadLetterQueueOptions {
            capture_stack_traces: true,
            ..Default::default()
        };
        options.actor_type_configurations.insert(
            "Worker".to_owned(),
            ActorTypeDlqConfig {
                max_messages: Some(10),
                ..Default::default()
            },
        );

        let effective = options.effective_for("Worker");
        assert_eq!(effective.max_messages, 10);
        assert!(effective.enabled); // inherited
        assert!(effective.capture_stack_traces); // inherited
    }

    #[test]
    fn test_override_can_disable() {
        let mut options = DeadLetterQueueOptions::default();
        options.actor_type_configurations.insert(
            "Quiet".to_owned(),
            ActorTypeDlqConfig {
                enabled: Some(false),
                ..Default::default()
            },
        );
        assert!(!options.effective_for("Quiet").enabled);
        assert!(options.effective_for("Other").enabled);
    }

    #[test]
    fn test_retry_policy_per_type_over_global() {
        let mut options = DeadLetterQueueOptions {
            global_retry_policy: Some(RetryPolicy::default()),
            ..Default::default()
        };
        options.actor_type_configurations.insert(
            "Eager".to_owned(),
            ActorTypeDlqConfig {
                retry_policy: Some(RetryPolicy {
                    max_attempts: 7,
                    ..Default::default()
                }),
                ..Default::default()
            },
        );

        assert_eq!(
            options
                .effective_for("Eager")
                .retry_policy
                .map(|p| p.max_attempts),
            Some(7)
        );
        assert_eq!(
            options
                .effective_for("Other")
                .retry_policy
                .map(|p| p.max_attempts),
            Some(3)
        );
    }

    #[test]
    fn test_retry_schedule() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        };
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }
}
