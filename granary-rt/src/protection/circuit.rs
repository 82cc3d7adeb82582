// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

// Layer 3: Internal module imports
// (none)

/// Circuit-breaker parameters.
///
/// Failures are counted within `sampling_window` (windowed, not
/// consecutive); `failure_threshold` windowed failures open the circuit,
/// `timeout` later it half-opens, and `success_threshold` consecutive
/// half-open successes close it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerOptions {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
    pub sampling_window: Duration,
    pub enabled: bool,
}

impl Default for CircuitBreakerOptions {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(30),
            sampling_window: Duration::from_secs(60),
            enabled: false,
        }
    }
}

/// Circuit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow normally
    Closed = 0,

    /// Calls are rejected until the timeout elapses
    Open = 1,

    /// Trial calls flow; successes close, a failure re-opens
    HalfOpen = 2,
}

struct CircuitInner {
    state: CircuitState,
    failures: VecDeque<DateTime<Utc>>,
    half_open_successes: u32,
    opened_at: Option<DateTime<Utc>>,
}

/// Windowed circuit breaker guarding one actor type.
pub struct CircuitBreaker {
    options: CircuitBreakerOptions,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(options: CircuitBreakerOptions) -> Self {
        Self {
            options,
            inner: Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                failures: VecDeque::new(),
                half_open_successes: 0,
                opened_at: None,
            }),
        }
    }

    fn window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.options.sampling_window)
            .unwrap_or(chrono::Duration::MAX)
    }

    fn timeout(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.options.timeout).unwrap_or(chrono::Duration::MAX)
    }

    /// The current state, applying the open-to-half-open timeout lazily.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        inner.state
    }

    fn refresh(&self, inner: &mut CircuitInner) {
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if Utc::now().signed_duration_since(opened_at) >= self.timeout() {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    debug!("circuit half-open");
                }
            }
        }
    }

    /// Whether a call may proceed right now. A disabled breaker always
    /// admits.
    pub fn allow(&self) -> bool {
        if !self.options.enabled {
            return true;
        }
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        inner.state != CircuitState::Open
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        if !self.options.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_successes += 1;
            if inner.half_open_successes >= self.options.success_threshold {
                inner.state = CircuitState::Closed;
                inner.failures.clear();
                inner.opened_at = None;
                debug!("circuit closed");
            }
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        if !self.options.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Utc::now());
                debug!("circuit re-opened from half-open");
            }
            CircuitState::Closed => {
                let now = Utc::now();
                inner.failures.push_back(now);
                let cutoff = now - self.window();
                while inner
                    .failures
                    .front()
                    .map(|stamp| *stamp < cutoff)
                    .unwrap_or(false)
                {
                    inner.failures.pop_front();
                }
                if inner.failures.len() as u32 >= self.options.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    debug!("circuit opened");
                }
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_options(timeout: Duration) -> CircuitBreakerOptions {
        CircuitBreakerOptions {
            failure_threshold: 3,
            success_threshold: 2,
            timeout,
            sampling_window: Duration::from_secs(60),
            enabled: true,
        }
    }

    #[test]
    fn test_defaults() {
        let options = CircuitBreakerOptions::default();
        assert_eq!(options.failure_threshold, 5);
        assert_eq!(options.success_threshold, 3);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.sampling_window, Duration::from_secs(60));
        assert!(!options.enabled);
    }

    #[test]
    fn test_state_discriminants() {
        assert_eq!(CircuitState::Closed as u8, 0);
        assert_eq!(CircuitState::Open as u8, 1);
        assert_eq!(CircuitState::HalfOpen as u8, 2);
    }

    #[test]
    fn test_disabled_breaker_always_admits() {
        let breaker = CircuitBreaker::new(CircuitBreakerOptions::default());
        for _ in 0..100 {
            breaker.record_failure();
        }
        assert!(breaker.allow());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_opens_after_windowed_failures() {
        let breaker = CircuitBreaker::new(enabled_options(Duration::from_secs(30)));
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow());
    }

    #[tokio::test]
    async fn test_half_open_after_timeout_then_closes() {
        let breaker = CircuitBreaker::new(enabled_options(Duration::from_millis(20)));
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(enabled_options(Duration::from_millis(20)));
        for _ in 0..3 {
            breaker.record_failure();
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow());
    }
}
