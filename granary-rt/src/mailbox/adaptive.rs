// Layer 1: Standard library imports
use std::collections::VecDeque;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Default initial capacity for adaptive mailboxes
pub const DEFAULT_ADAPTIVE_INITIAL_CAPACITY: usize = 1000;

/// Default capacity floor
pub const DEFAULT_ADAPTIVE_MIN_CAPACITY: usize = 100;

/// Default capacity ceiling
pub const DEFAULT_ADAPTIVE_MAX_CAPACITY: usize = 10_000;

/// Adaptive-capacity parameters for mailboxes.
///
/// When enabled, the mailbox samples its fill ratio on every post; after
/// `min_samples_before_adapt` observations a rolling average at or above
/// `grow_threshold` multiplies capacity by `growth_factor` (capped at
/// `max_capacity`), at or below `shrink_threshold` multiplies it by
/// `shrink_factor` (floored at `min_capacity`). Disabled by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveMailboxOptions {
    pub enabled: bool,
    pub initial_capacity: usize,
    pub min_capacity: usize,
    pub max_capacity: usize,
    pub grow_threshold: f64,
    pub shrink_threshold: f64,
    pub growth_factor: f64,
    pub shrink_factor: f64,
    pub min_samples_before_adapt: usize,
}

impl Default for AdaptiveMailboxOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_capacity: DEFAULT_ADAPTIVE_INITIAL_CAPACITY,
            min_capacity: DEFAULT_ADAPTIVE_MIN_CAPACITY,
            max_capacity: DEFAULT_ADAPTIVE_MAX_CAPACITY,
            grow_threshold: 0.8,
            shrink_threshold: 0.2,
            growth_factor: 2.0,
            shrink_factor: 0.5,
            min_samples_before_adapt: 10,
        }
    }
}

/// Rolling fill-ratio window driving capacity decisions.
pub(crate) struct AdaptiveState {
    options: AdaptiveMailboxOptions,
    samples: VecDeque<f64>,
}

impl AdaptiveState {
    pub(crate) fn new(options: AdaptiveMailboxOptions) -> Self {
        Self {
            options,
            samples: VecDeque::new(),
        }
    }

    /// Record one fill-ratio observation and return the new capacity when
    /// the window votes to adapt. The window resets after each decision so
    /// one burst adapts once.
    pub(crate) fn observe(&mut self, depth: usize, capacity: usize) -> Option<usize> {
        if capacity == 0 {
            return None;
        }
        let ratio = depth as f64 / capacity as f64;
        self.samples.push_back(ratio);
        if self.samples.len() > self.options.min_samples_before_adapt {
            self.samples.pop_front();
        }
        if self.samples.len() < self.options.min_samples_before_adapt {
            return None;
        }
        let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;

        if mean >= self.options.grow_threshold {
            let grown = ((capacity as f64) * self.options.growth_factor) as usize;
            let grown = grown.min(self.options.max_capacity);
            if grown != capacity {
                self.samples.clear();
                return Some(grown);
            }
        } else if mean <= self.options.shrink_threshold {
            let shrunk = ((capacity as f64) * self.options.shrink_factor) as usize;
            let shrunk = shrunk.max(self.options.min_capacity);
            if shrunk != capacity {
                self.samples.clear();
                return Some(shrunk);
            }
        }
        None
    }
}
