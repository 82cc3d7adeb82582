//! Runtime configuration and the silo-level facade.

pub mod config;
pub mod runtime;

pub use config::RuntimeConfig;
pub use runtime::{ActorRuntime, RuntimeError};
