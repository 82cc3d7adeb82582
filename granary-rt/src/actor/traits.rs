//! The virtual-actor trait and its activation-scoped context.
//!
//! Application actors implement [`VirtualActor`]; the runtime owns one
//! activation per identity and drives every callback from that
//! activation's serialized worker, so no `&mut self` method of one
//! identity ever runs concurrently with itself.

// Layer 1: Standard library imports
use std::any::Any;
use std::error::Error;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use super::supervision::{ChildFailureContext, SupervisionDirective};
use crate::message::StreamMessage;
use crate::storage::{StorageError, StorageProviderRegistry};
use crate::util::{ActorIdentity, StreamId};

/// Erased error type surfaced by actor callbacks and methods.
pub type ActorError = Box<dyn Error + Send + Sync + 'static>;

/// Downcast seam between the erased activation state and the concrete
/// actor type a dispatcher was generated for.
pub trait AsAny {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A virtual actor: per-identity state plus asynchronous callbacks.
///
/// Method bodies are reached through the dispatcher registry, not through
/// this trait; the trait carries the lifecycle and stream callbacks every
/// actor shares.
///
/// # Example
/// ```rust
/// use granary_rt::actor::{ActivationContext, ActorError, VirtualActor};
/// use async_trait::async_trait;
///
/// struct CounterActor {
///     count: u64,
/// }
///
/// #[async_trait]
/// impl VirtualActor for CounterActor {
///     async fn on_activate(&mut self, _ctx: &ActivationContext) -> Result<(), ActorError> {
///         self.count = 0;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait VirtualActor: AsAny + Send + 'static {
    /// Called exactly once, before the first message is processed.
    async fn on_activate(&mut self, _ctx: &ActivationContext) -> Result<(), ActorError> {
        Ok(())
    }

    /// Called exactly once, after the last message has completed.
    async fn on_deactivate(&mut self, _ctx: &ActivationContext) -> Result<(), ActorError> {
        Ok(())
    }

    /// Delivery callback for implicit stream subscriptions.
    async fn on_stream_message(
        &mut self,
        _message: StreamMessage,
        _stream: &StreamId,
        _cancel: CancellationToken,
    ) -> Result<(), ActorError> {
        Ok(())
    }

    /// Supervision decision for a failed child. Defaults to restart.
    async fn on_child_failure(&mut self, _ctx: ChildFailureContext) -> SupervisionDirective {
        SupervisionDirective::Restart
    }
}

impl dyn VirtualActor {
    /// Downcast the erased actor to its concrete type.
    pub fn downcast_mut<T: VirtualActor>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Downcast the erased actor to its concrete type, by shared reference.
    pub fn downcast_ref<T: VirtualActor>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Per-activation context: identity plus the state API surface.
///
/// State calls are scoped to the owning activation's `actor_id` and go
/// through the process-wide storage provider registry with optimistic
/// versioning.
pub struct ActivationContext {
    identity: ActorIdentity,
    activated_at: DateTime<Utc>,
    storage: Arc<StorageProviderRegistry>,
}

impl ActivationContext {
    /// Build a context for one activation.
    pub fn new(identity: ActorIdentity, storage: Arc<StorageProviderRegistry>) -> Self {
        Self {
            identity,
            activated_at: Utc::now(),
            storage,
        }
    }

    /// The activation's logical identity.
    pub fn identity(&self) -> &ActorIdentity {
        &self.identity
    }

    /// When this activation was created.
    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    /// The storage provider registry backing the state API.
    pub fn storage(&self) -> &Arc<StorageProviderRegistry> {
        &self.storage
    }

    /// Persist a named state object, optionally guarded by a version.
    ///
    /// Returns the new version. Fails with
    /// [`StorageError::ConcurrencyConflict`] when `expected_version` is
    /// `Some` and differs from the stored version.
    pub async fn save_state<T>(
        &self,
        name: &str,
        state: &T,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError>
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.storage
            .default_storage::<T>()
            .save_with_version(self.identity.actor_id(), name, state, expected_version)
            .await
    }

    /// Load a named state object with its current version.
    pub async fn load_state<T>(&self, name: &str) -> Result<Option<(T, u64)>, StorageError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.storage
            .default_storage::<T>()
            .load_with_version(self.identity.actor_id(), name)
            .await
    }

    /// Delete a named state object, optionally guarded by a version.
    pub async fn delete_state<T>(
        &self,
        name: &str,
        expected_version: Option<u64>,
    ) -> Result<(), StorageError>
    where
        T: Send + Sync + 'static,
    {
        self.storage
            .default_storage::<T>()
            .delete(self.identity.actor_id(), name, expected_version)
            .await
    }
}
