//! Pluggable per-namespace state stores with optimistic versioning.
//!
//! A process-wide [`StorageProviderRegistry`] maps provider names to store
//! factories and memoizes one instance per `(provider, state type)`. When
//! no factory is registered the in-memory store is supplied.

pub mod in_memory;
pub mod provider;

pub use in_memory::InMemoryStateStore;
pub use provider::{
    StorageProviderRegistry, TypedStateStorage, DEFAULT_STORAGE_PROVIDER,
};

// Layer 2: Third-party crate imports
use async_trait::async_trait;

/// Storage error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Optimistic version guard failed
    #[error(
        "Concurrency conflict for {actor_id}/{state_name}: expected version {expected:?}, found {found:?}"
    )]
    ConcurrencyConflict {
        actor_id: String,
        state_name: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    /// State value failed to (de)serialize
    #[error("State serialization failed: {0}")]
    Serialization(String),
}

/// Object-safe store contract: versioned save/load/delete of named state
/// objects scoped to one actor id.
///
/// Versions start at 1 on first save and increment on every successful
/// write. A `Some(expected)` guard that does not match the stored version
/// fails with [`StorageError::ConcurrencyConflict`] and leaves the store
/// unmodified; a `None` guard writes unconditionally.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Save a state value, returning the new version.
    async fn save(
        &self,
        actor_id: &str,
        state_name: &str,
        value: serde_json::Value,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError>;

    /// Load a state value with its current version.
    async fn load(
        &self,
        actor_id: &str,
        state_name: &str,
    ) -> Result<Option<(serde_json::Value, u64)>, StorageError>;

    /// Delete a state value. Deleting an absent value with no guard is a
    /// no-op.
    async fn delete(
        &self,
        actor_id: &str,
        state_name: &str,
        expected_version: Option<u64>,
    ) -> Result<(), StorageError>;
}
