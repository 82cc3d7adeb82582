//! Per-actor-type log sampling.
//!
//! Emission itself goes through `tracing`; this module only answers
//! whether a given site should log at all. Sampling never suppresses
//! below-minimum levels, and errors stay exempt unless configured
//! otherwise.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use rand::Rng;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Log severity, ordered ascending. `Information = 2` is the default
/// sampling floor; `Error = 4` is the always-log exemption floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Information = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
}

/// One sampling decision profile.
///
/// `should_log` applies the rules in order: disabled sampling logs
/// everything, a rate of 1 logs everything, below-minimum levels always
/// log, errors log when `always_log_errors`, and everything else takes a
/// random draw against `sampling_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSamplingConfiguration {
    pub enabled: bool,
    pub sampling_rate: f64,
    pub minimum_level_for_sampling: LogLevel,
    pub always_log_errors: bool,
}

impl Default for LogSamplingConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            sampling_rate: 1.0,
            minimum_level_for_sampling: LogLevel::Information,
            always_log_errors: true,
        }
    }
}

impl LogSamplingConfiguration {
    /// Whether a site at `level` should emit.
    pub fn should_log(&self, level: LogLevel) -> bool {
        if !self.enabled {
            return true;
        }
        if self.sampling_rate >= 1.0 {
            return true;
        }
        if level < self.minimum_level_for_sampling {
            return true;
        }
        if self.always_log_errors && level >= LogLevel::Error {
            return true;
        }
        rand::thread_rng().gen::<f64>() < self.sampling_rate
    }
}

/// Actor logging options: scope tagging plus sampling profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorLoggingOptions {
    /// Tag log scopes with the actor identity
    pub use_actor_scopes: bool,

    /// Fallback sampling profile for all actor types
    pub global_sampling_configuration: Option<LogSamplingConfiguration>,

    /// Per-type sampling profiles, keyed by type name
    pub actor_type_sampling_configurations: HashMap<String, LogSamplingConfiguration>,
}

impl ActorLoggingOptions {
    /// The sampling profile for an actor type: the per-type entry if
    /// present, else the global profile, else none.
    pub fn sampling_configuration_for(
        &self,
        actor_type: &str,
    ) -> Option<&LogSamplingConfiguration> {
        self.actor_type_sampling_configurations
            .get(actor_type)
            .or(self.global_sampling_configuration.as_ref())
    }
}
