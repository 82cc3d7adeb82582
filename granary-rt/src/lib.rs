//! # granary-rt - Distributed Virtual-Actor Runtime Core
//!
//! Virtual actors with per-identity serialized mailboxes, pluggable
//! placement over a consistent-hash ring, cluster health scoring, and a
//! namespaced stream broker with implicit subscriptions.
//!
//! Application code declares actor types and their method tables; the
//! runtime activates one instance per `(type, id)` identity, routes
//! framed invocations to it, persists its state with optimistic
//! versioning, and captures failures into per-type dead-letter queues.
//! Callers address actors by logical identity only - which silo hosts an
//! activation is placement's concern, never the caller's.
//!
//! # Quick Start
//!
//! ```rust
//! use granary_rt::prelude::*;
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct GreeterActor;
//!
//! #[async_trait]
//! impl VirtualActor for GreeterActor {}
//!
//! # tokio_test::block_on(async {
//! // 1. Register the method table the code generator would emit.
//! let dispatchers = Arc::new(DispatcherRegistry::new());
//! let mut table = MethodTable::<GreeterActor>::new();
//! table
//!     .register("Greet", |_actor, payload, _cancel| {
//!         Box::pin(async move {
//!             let name = String::from_utf8_lossy(&payload).into_owned();
//!             Ok(Bytes::from(format!("hello, {name}")))
//!         })
//!     })
//!     .unwrap();
//! dispatchers.register_table("Greeter", table).unwrap();
//!
//! // 2. Register the actor constructor.
//! let catalog = ActorCatalog::new();
//! catalog.register("Greeter", |_identity| Box::new(GreeterActor));
//!
//! // 3. Assemble the runtime and invoke by identity.
//! let runtime = ActorRuntime::new(RuntimeConfig::default(), catalog, dispatchers);
//! let reply = runtime
//!     .invoke("Greeter", "g1", "Greet", Bytes::from_static(b"world"), CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(&reply[..], b"hello, world");
//! runtime.shutdown().await;
//! # });
//! ```
//!
//! # Execution Model
//!
//! Parallel across activations, strictly serialized within one: each
//! activation owns a bounded FIFO mailbox and a single worker task that
//! processes one message at a time, so user code for an identity never
//! runs concurrently with itself. Cross-actor work shares nothing except
//! through actor boundaries. Per sender-receiver pair delivery is FIFO;
//! across senders there is no order.
//!
//! # Module Organization
//!
//! ## Core Actor System
//! - [`actor`] - Virtual-actor trait, activations, factory, supervision
//! - [`message`] - Invocation records, mailbox envelopes, wire codec
//! - [`mailbox`] - Bounded FIFO queues, activity tracking, adaptive capacity
//! - [`dispatch`] - Name-indexed method dispatch per actor type
//!
//! ## Cluster Services
//! - [`placement`] - Hash ring, directory contract, placement policies,
//!   locality analysis
//! - [`health`] - Composite silo health scores and failure-trend detection
//! - [`stream`] - Namespaced pub/sub with implicit subscriptions, lazy
//!   stream operators
//!
//! ## Durability and Protection
//! - [`storage`] - Pluggable state stores with optimistic versioning
//! - [`dlq`] - Dead-letter capture with per-type effective configuration
//! - [`protection`] - Circuit breaker and inbound rate limiting
//!
//! ## Infrastructure
//! - [`logging`] - Per-actor-type log-sampling decisions
//! - [`system`] - Runtime configuration and the silo facade
//! - [`util`] - Identity newtypes

pub mod actor;
pub mod dispatch;
pub mod dlq;
pub mod health;
pub mod logging;
pub mod mailbox;
pub mod message;
pub mod placement;
pub mod protection;
pub mod storage;
pub mod stream;
pub mod system;
pub mod util;

// Re-export commonly used types
pub use actor::{
    Activation, ActivationContext, ActorCatalog, ActorError, ActorFactory, ChildFailureContext,
    FactoryError, InvokeError, SupervisionDirective, VirtualActor,
};
pub use dispatch::{ActorDispatcher, DispatchError, DispatcherRegistry, MethodTable};
pub use dlq::{DeadLetterEntry, DeadLetterQueue, DeadLetterQueueOptions, RetryPolicy};
pub use health::{HealthScoreCalculator, SiloHealthScore};
pub use logging::{ActorLoggingOptions, LogLevel, LogSamplingConfiguration};
pub use mailbox::{
    ActivityTracker, AdaptiveMailboxOptions, InMemoryActivityTracker, Mailbox, MailboxError,
};
pub use message::{Envelope, InvocationMessage, StreamMessage};
pub use placement::{
    ActorDirectory, ConsistentHashPlacement, HashRing, InMemoryDirectory, LocalPreferredPlacement,
    LocalityAnalyzer, LocalityAwarePlacement, PlacementPolicy, RandomPlacement,
    StatelessWorkerPlacement,
};
pub use protection::{CircuitBreakerOptions, CircuitState, ExcessAction, RateLimitOptions};
pub use storage::{StateStore, StorageError, StorageProviderRegistry, TypedStateStorage};
pub use stream::{ActorStreamExt, StreamBroker, StreamError};
pub use system::{ActorRuntime, RuntimeConfig, RuntimeError};
pub use util::{ActorIdentity, MessageId, SiloId, StreamId};

/// Everything a typical actor module needs in scope.
pub mod prelude {
    pub use crate::actor::{
        ActivationContext, ActorCatalog, ActorError, ActorFactory, SupervisionDirective,
        VirtualActor,
    };
    pub use crate::dispatch::{DispatcherRegistry, MethodTable};
    pub use crate::message::StreamMessage;
    pub use crate::stream::ActorStreamExt;
    pub use crate::system::{ActorRuntime, RuntimeConfig};
    pub use crate::util::{ActorIdentity, SiloId, StreamId};
}
