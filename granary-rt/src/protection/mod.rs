//! Per-actor-type overload protection: circuit breaking and inbound
//! rate limiting. Both are disabled by default and sit on the client
//! invoke path, in front of the mailbox.

pub mod circuit;
pub mod rate_limit;

pub use circuit::{CircuitBreaker, CircuitBreakerOptions, CircuitState};
pub use rate_limit::{ExcessAction, RateLimitDecision, RateLimitOptions, RateLimiter};
