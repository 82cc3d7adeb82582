//! Utility types shared across the runtime.
//!
//! Identity newtypes (`ActorIdentity`, `MessageId`, `SiloId`, `StreamId`)
//! with validation, display formatting, and serde support.

pub mod ids;

pub use ids::{ActorIdentity, IdentityError, MessageId, SiloId, StreamId};
