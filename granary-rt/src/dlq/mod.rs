//! Dead-letter capture for undeliverable and failed messages.
//!
//! One bounded ring per actor type; overflow evicts the oldest entry.
//! Configuration composes per-type overrides over the global defaults.

pub mod config;
pub mod queue;

pub use config::{
    ActorTypeDlqConfig, DeadLetterQueueOptions, EffectiveDlqConfig, RetryPolicy,
};
pub use queue::{DeadLetterEntry, DeadLetterQueue};
