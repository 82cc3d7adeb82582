// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// What happens to messages beyond the window budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExcessAction {
    /// Silently discard the message
    Drop = 0,

    /// Fail the call back to the sender
    Reject = 1,

    /// Enqueue anyway and let mailbox back-pressure apply
    Queue = 2,
}

/// Inbound rate-limit parameters. Disabled by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitOptions {
    pub max_messages_per_window: u32,
    pub time_window: Duration,
    pub excess_action: ExcessAction,
    pub enabled: bool,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            max_messages_per_window: 1000,
            time_window: Duration::from_secs(1),
            excess_action: ExcessAction::Drop,
            enabled: false,
        }
    }
}

/// Admission decision for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Within budget
    Admit,

    /// Over budget, silently dropped
    Drop,

    /// Over budget, failed back to the sender
    Reject,

    /// Over budget, enqueued anyway
    Queue,
}

struct Window {
    started: DateTime<Utc>,
    count: u32,
}

/// Fixed-window rate limiter guarding one actor type.
pub struct RateLimiter {
    options: RateLimitOptions,
    window: Mutex<Window>,
}

impl RateLimiter {
    /// Create a limiter with a fresh window.
    pub fn new(options: RateLimitOptions) -> Self {
        Self {
            options,
            window: Mutex::new(Window {
                started: Utc::now(),
                count: 0,
            }),
        }
    }

    /// Decide admission for one message. A disabled limiter always admits.
    pub fn check(&self) -> RateLimitDecision {
        if !self.options.enabled {
            return RateLimitDecision::Admit;
        }
        let window_length = chrono::Duration::from_std(self.options.time_window)
            .unwrap_or(chrono::Duration::MAX);
        let mut window = self.window.lock();
        let now = Utc::now();
        if now.signed_duration_since(window.started) >= window_length {
            window.started = now;
            window.count = 0;
        }
        if window.count < self.options.max_messages_per_window {
            window.count += 1;
            return RateLimitDecision::Admit;
        }
        match self.options.excess_action {
            ExcessAction::Drop => RateLimitDecision::Drop,
            ExcessAction::Reject => RateLimitDecision::Reject,
            ExcessAction::Queue => RateLimitDecision::Queue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_options(max: u32, action: ExcessAction) -> RateLimitOptions {
        RateLimitOptions {
            max_messages_per_window: max,
            time_window: Duration::from_millis(50),
            excess_action: action,
            enabled: true,
        }
    }

    #[test]
    fn test_defaults() {
        let options = RateLimitOptions::default();
        assert_eq!(options.max_messages_per_window, 1000);
        assert_eq!(options.time_window, Duration::from_secs(1));
        assert_eq!(options.excess_action, ExcessAction::Drop);
        assert!(!options.enabled);
    }

    #[test]
    fn test_action_discriminants() {
        assert_eq!(ExcessAction::Drop as u8, 0);
        assert_eq!(ExcessAction::Reject as u8, 1);
        assert_eq!(ExcessAction::Queue as u8, 2);
    }

    #[test]
    fn test_disabled_always_admits() {
        let limiter = RateLimiter::new(RateLimitOptions::default());
        for _ in 0..5000 {
            assert_eq!(limiter.check(), RateLimitDecision::Admit);
        }
    }

    #[test]
    fn test_budget_then_excess_action() {
        let limiter = RateLimiter::new(enabled_options(3, ExcessAction::Reject));
        for _ in 0..3 {
            assert_eq!(limiter.check(), RateLimitDecision::Admit);
        }
        assert_eq!(limiter.check(), RateLimitDecision::Reject);

        let dropper = RateLimiter::new(enabled_options(1, ExcessAction::Drop));
        assert_eq!(dropper.check(), RateLimitDecision::Admit);
        assert_eq!(dropper.check(), RateLimitDecision::Drop);

        let queuer = RateLimiter::new(enabled_options(1, ExcessAction::Queue));
        assert_eq!(queuer.check(), RateLimitDecision::Admit);
        assert_eq!(queuer.check(), RateLimitDecision::Queue);
    }

    #[tokio::test]
    async fn test_window_rolls_over() {
        let limiter = RateLimiter::new(enabled_options(1, ExcessAction::Reject));
        assert_eq!(limiter.check(), RateLimitDecision::Admit);
        assert_eq!(limiter.check(), RateLimitDecision::Reject);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(limiter.check(), RateLimitDecision::Admit);
    }
}
