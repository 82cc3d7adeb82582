// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// Layer 3: Internal module imports
use super::config::RuntimeConfig;
use crate::actor::{Activation, ActorCatalog, ActorFactory, FactoryError, InvokeError};
use crate::dispatch::{DispatchError, DispatcherRegistry};
use crate::mailbox::{ActivityTracker, InMemoryActivityTracker};
use crate::message::StreamMessage;
use crate::protection::{
    CircuitBreaker, RateLimitDecision, RateLimiter,
};
use crate::storage::StorageProviderRegistry;
use crate::stream::{clear_broker, StreamBroker, StreamError};
use crate::util::StreamId;

/// Runtime error types for the client invoke path.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Activation or identity failure
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// Mailbox or dispatch failure
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// Stream registration or delivery failure
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The rate limiter rejected the call
    #[error("Rate limit exceeded for actor type '{0}'")]
    RateLimited(String),

    /// The circuit for the type is open
    #[error("Circuit open for actor type '{0}'")]
    CircuitOpen(String),
}

/// Silo-level facade composing the factory, dispatch, streams, storage,
/// and per-type protection.
///
/// The invoke path runs admission (rate limit, then circuit breaker)
/// before touching the mailbox, and feeds dispatch outcomes back into
/// the circuit.
///
/// # Example
/// ```rust,ignore
/// let runtime = ActorRuntime::new(RuntimeConfig::default(), catalog, dispatchers);
/// let reply = runtime
///     .invoke("BankAccount", "acct-1", "Deposit", payload, CancellationToken::new())
///     .await?;
/// runtime.shutdown().await;
/// ```
pub struct ActorRuntime {
    config: RuntimeConfig,
    factory: Arc<ActorFactory>,
    broker: Arc<StreamBroker>,
    storage: Arc<StorageProviderRegistry>,
    tracker: Arc<InMemoryActivityTracker>,
    circuit_breakers: DashMap<String, Arc<CircuitBreaker>>,
    rate_limiters: DashMap<String, Arc<RateLimiter>>,
}

impl ActorRuntime {
    /// Assemble a runtime from a catalog and a dispatcher registry.
    pub fn new(
        config: RuntimeConfig,
        catalog: ActorCatalog,
        dispatchers: Arc<DispatcherRegistry>,
    ) -> Arc<Self> {
        let storage = Arc::new(StorageProviderRegistry::new());
        let tracker = Arc::new(InMemoryActivityTracker::new());
        let factory = ActorFactory::new(catalog, dispatchers, Arc::clone(&storage))
            .with_dead_letter_options(config.dead_letter_queue.clone())
            .with_adaptive_mailboxes(config.adaptive_mailbox.clone())
            .with_mailbox_capacity(config.default_mailbox_capacity)
            .with_tracker(Arc::clone(&tracker) as Arc<dyn ActivityTracker>)
            .shared();
        let broker = Arc::new(StreamBroker::new(Arc::clone(&factory)));
        info!("actor runtime assembled");
        Arc::new(Self {
            config,
            factory,
            broker,
            storage,
            tracker,
            circuit_breakers: DashMap::new(),
            rate_limiters: DashMap::new(),
        })
    }

    /// The runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The activation factory.
    pub fn factory(&self) -> &Arc<ActorFactory> {
        &self.factory
    }

    /// The stream broker.
    pub fn broker(&self) -> &Arc<StreamBroker> {
        &self.broker
    }

    /// The storage provider registry.
    pub fn storage(&self) -> &Arc<StorageProviderRegistry> {
        &self.storage
    }

    /// The activity tracker observing every mailbox.
    pub fn tracker(&self) -> &Arc<InMemoryActivityTracker> {
        &self.tracker
    }

    fn circuit_for(&self, type_name: &str) -> Arc<CircuitBreaker> {
        self.circuit_breakers
            .entry(type_name.to_owned())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.config.circuit_breaker.clone())))
            .clone()
    }

    fn limiter_for(&self, type_name: &str) -> Arc<RateLimiter> {
        self.rate_limiters
            .entry(type_name.to_owned())
            .or_insert_with(|| Arc::new(RateLimiter::new(self.config.rate_limit.clone())))
            .clone()
    }

    /// Invoke a method on the actor addressed by `(type, id)`.
    ///
    /// Admission order: rate limit, circuit breaker, mailbox. A `Drop`
    /// excess action discards the call and answers with empty bytes; a
    /// `Reject` action fails it; `Queue` bypasses the budget and lets the
    /// mailbox apply back-pressure.
    pub async fn invoke(
        &self,
        type_name: &str,
        actor_id: &str,
        method: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> Result<Bytes, RuntimeError> {
        match self.limiter_for(type_name).check() {
            RateLimitDecision::Admit | RateLimitDecision::Queue => {}
            RateLimitDecision::Drop => {
                debug!(type_name, actor_id, method, "rate limit drop");
                return Ok(Bytes::new());
            }
            RateLimitDecision::Reject => {
                return Err(RuntimeError::RateLimited(type_name.to_owned()));
            }
        }

        let circuit = self.circuit_for(type_name);
        if !circuit.allow() {
            return Err(RuntimeError::CircuitOpen(type_name.to_owned()));
        }

        let activation = self.factory.get_or_create(type_name, actor_id).await?;
        let outcome = activation.invoke(method, payload, cancel).await;
        match &outcome {
            Ok(_) => circuit.record_success(),
            Err(InvokeError::Dispatch(DispatchError::MethodFailure { .. }))
            | Err(InvokeError::MailboxRejected { .. })
            | Err(InvokeError::WorkerStopped) => circuit.record_failure(),
            // Caller-shaped failures (unknown method, cancellation) say
            // nothing about the silo's health.
            Err(_) => {}
        }
        outcome.map_err(RuntimeError::from)
    }

    /// Publish a message onto a stream.
    pub async fn publish(
        &self,
        stream: &StreamId,
        message: StreamMessage,
    ) -> Result<usize, RuntimeError> {
        Ok(self.broker.publish(stream, message).await?)
    }

    /// The registered activation for `(type, id)`, creating it on demand.
    pub async fn activation(
        &self,
        type_name: &str,
        actor_id: &str,
    ) -> Result<Arc<Activation>, RuntimeError> {
        Ok(self.factory.get_or_create(type_name, actor_id).await?)
    }

    /// Deactivate every activation and clear the process broker slot.
    pub async fn shutdown(&self) {
        info!("actor runtime shutting down");
        self.factory.deactivate_all().await;
        clear_broker();
    }
}
