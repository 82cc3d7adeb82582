// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use crate::actor::ActorFactory;
use crate::message::{Envelope, StreamMessage};
use crate::util::{IdentityError, StreamId};

/// Stream error types.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Namespace or key was empty/whitespace
    #[error(transparent)]
    InvalidIdentity(#[from] IdentityError),

    /// The subscribing actor type is not in the catalog
    #[error("Actor type '{0}' is not registered in the catalog")]
    UnknownActorType(String),

    /// `set_broker(None)` is rejected by contract
    #[error("The broker registry does not accept a null broker")]
    NullBroker,

    /// A subscriber could not be activated for delivery
    #[error("Subscriber activation failed: {0}")]
    SubscriberActivation(String),
}

/// One implicit subscription: every publish in the namespace reaches
/// every activation of the actor type, keyed by the stream's routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitSubscription {
    pub actor_type: String,
    pub message_type: String,
}

/// Callback registered through [`StreamHandle::subscribe`].
pub type StreamHandler = Arc<dyn Fn(StreamMessage, &StreamId) + Send + Sync>;

/// Namespaced pub/sub broker with implicit-subscription auto-activation.
///
/// The broker holds the factory for activation lookup only; subscriber
/// lifetime is governed by the factory, never by subscription count.
/// Delivery is at-least-once, unordered across subscribers, FIFO per
/// subscriber in publish order.
///
/// # Example
/// ```rust,ignore
/// let broker = StreamBroker::new(factory);
/// broker.register_implicit_subscription("orders/processed", "OrderActor", "OrderEvent")?;
/// broker
///     .publish(&StreamId::new("orders/processed", "a1")?, StreamMessage::from_text("m"))
///     .await?;
/// ```
pub struct StreamBroker {
    factory: Arc<ActorFactory>,
    subscriptions: DashMap<String, Vec<ImplicitSubscription>>,
    handlers: DashMap<StreamId, Vec<StreamHandler>>,
}

impl StreamBroker {
    /// Create a broker delivering through the given factory.
    pub fn new(factory: Arc<ActorFactory>) -> Self {
        Self {
            factory,
            subscriptions: DashMap::new(),
            handlers: DashMap::new(),
        }
    }

    /// Record that all publishes under `namespace` must be delivered to
    /// every activation of `actor_type`, with the stream key as actor id.
    ///
    /// Fails on an empty/whitespace namespace and on an actor type the
    /// catalog does not know. Re-registering an identical subscription is
    /// a no-op.
    pub fn register_implicit_subscription(
        &self,
        namespace: &str,
        actor_type: &str,
        message_type: &str,
    ) -> Result<(), StreamError> {
        if namespace.trim().is_empty() {
            return Err(StreamError::InvalidIdentity(IdentityError::EmptyNamespace));
        }
        if !self.factory.catalog().contains(actor_type) {
            return Err(StreamError::UnknownActorType(actor_type.to_owned()));
        }
        let subscription = ImplicitSubscription {
            actor_type: actor_type.to_owned(),
            message_type: message_type.to_owned(),
        };
        let mut entries = self.subscriptions.entry(namespace.to_owned()).or_default();
        if !entries.contains(&subscription) {
            debug!(namespace, actor_type, message_type, "implicit subscription registered");
            entries.push(subscription);
        }
        Ok(())
    }

    /// The subscriptions registered under a namespace.
    pub fn subscriptions(&self, namespace: &str) -> Vec<ImplicitSubscription> {
        self.subscriptions
            .get(namespace)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Publish a message to a stream, activating subscribers on demand.
    ///
    /// Returns how many subscriber mailboxes accepted the message. A
    /// subscriber whose mailbox rejects the delivery is skipped (its
    /// dead-letter queue records the rejection); a subscriber that cannot
    /// be activated fails the publish.
    pub async fn publish(
        &self,
        stream: &StreamId,
        message: StreamMessage,
    ) -> Result<usize, StreamError> {
        if let Some(handlers) = self.handlers.get(stream) {
            for handler in handlers.iter() {
                handler(message.clone(), stream);
            }
        }
        let subscribers = self.subscriptions(stream.namespace());
        self.notify_implicit_subscribers(stream, message, &subscribers)
            .await
    }

    /// Register an explicit per-stream handler. Handlers observe every
    /// publish on exactly this stream identity, alongside implicit
    /// delivery.
    pub fn subscribe(&self, stream: &StreamId, handler: StreamHandler) {
        self.handlers
            .entry(stream.clone())
            .or_default()
            .push(handler);
    }

    /// Deliver one message to each implicit subscriber's activation.
    async fn notify_implicit_subscribers(
        &self,
        stream: &StreamId,
        message: StreamMessage,
        subscribers: &[ImplicitSubscription],
    ) -> Result<usize, StreamError> {
        let mut delivered = 0;
        for subscription in subscribers {
            let activation = self
                .factory
                .get_or_create(&subscription.actor_type, stream.key())
                .await
                .map_err(|err| StreamError::SubscriberActivation(err.to_string()))?;
            let envelope = Envelope::Stream {
                stream: stream.clone(),
                message: message.clone(),
            };
            if activation.mailbox().post(envelope) {
                delivered += 1;
            } else {
                warn!(
                    stream = %stream,
                    actor_type = %subscription.actor_type,
                    "stream delivery rejected by subscriber mailbox"
                );
            }
        }
        Ok(delivered)
    }
}

/// Process-wide broker slot.
static CURRENT_BROKER: RwLock<Option<Arc<StreamBroker>>> = RwLock::new(None);

/// Install the process-wide broker. Passing `None` is rejected: the slot
/// is cleared only through [`clear_broker`] at shutdown.
pub fn set_broker(broker: Option<Arc<StreamBroker>>) -> Result<(), StreamError> {
    match broker {
        Some(broker) => {
            *CURRENT_BROKER.write() = Some(broker);
            Ok(())
        }
        None => Err(StreamError::NullBroker),
    }
}

/// The installed broker, if any.
pub fn current_broker() -> Option<Arc<StreamBroker>> {
    CURRENT_BROKER.read().clone()
}

/// Clear the broker slot (silo shutdown).
pub fn clear_broker() {
    *CURRENT_BROKER.write() = None;
}

/// App-facing stream surface: hands out per-stream handles.
pub struct StreamProvider {
    broker: Arc<StreamBroker>,
}

impl StreamProvider {
    /// Provide streams through the given broker.
    pub fn new(broker: Arc<StreamBroker>) -> Self {
        Self { broker }
    }

    /// The handle for one stream identity.
    pub fn get_stream(&self, stream: StreamId) -> StreamHandle {
        StreamHandle {
            broker: Arc::clone(&self.broker),
            stream,
        }
    }
}

/// One stream's publish/subscribe surface.
pub struct StreamHandle {
    broker: Arc<StreamBroker>,
    stream: StreamId,
}

impl StreamHandle {
    /// The stream identity this handle addresses.
    pub fn stream_id(&self) -> &StreamId {
        &self.stream
    }

    /// Publish a message onto this stream.
    pub async fn publish(&self, message: StreamMessage) -> Result<usize, StreamError> {
        self.broker.publish(&self.stream, message).await
    }

    /// Observe every publish on this stream.
    pub fn subscribe(&self, handler: StreamHandler) {
        self.broker.subscribe(&self.stream, handler);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;
    use crate::actor::{ActorCatalog, VirtualActor};
    use crate::dispatch::DispatcherRegistry;
    use crate::storage::StorageProviderRegistry;
    use async_trait::async_trait;

    struct NullActor;

    #[async_trait]
    impl VirtualActor for NullActor {}

    fn test_factory() -> Arc<ActorFactory> {
        let catalog = ActorCatalog::new();
        catalog.register("TestStreamActor", |_identity| Box::new(NullActor));
        ActorFactory::new(
            catalog,
            Arc::new(DispatcherRegistry::new()),
            Arc::new(StorageProviderRegistry::new()),
        )
        .shared()
    }

    #[test]
    fn test_register_rejects_empty_namespace() {
        let broker = StreamBroker::new(test_factory());
        assert!(matches!(
            broker.register_implicit_subscription("  ", "TestStreamActor", "String"),
            Err(StreamError::InvalidIdentity(IdentityError::EmptyNamespace))
        ));
    }

    #[test]
    fn test_register_rejects_unknown_type() {
        let broker = StreamBroker::new(test_factory());
        assert!(matches!(
            broker.register_implicit_subscription("orders", "Ghost", "String"),
            Err(StreamError::UnknownActorType(_))
        ));
    }

    #[test]
    fn test_register_deduplicates() {
        let broker = StreamBroker::new(test_factory());
        broker
            .register_implicit_subscription("orders", "TestStreamActor", "String")
            .unwrap();
        broker
            .register_implicit_subscription("orders", "TestStreamActor", "String")
            .unwrap();
        assert_eq!(broker.subscriptions("orders").len(), 1);
    }

    #[tokio::test]
    async fn test_publish_activates_subscriber() {
        let factory = test_factory();
        let broker = StreamBroker::new(Arc::clone(&factory));
        broker
            .register_implicit_subscription("orders/processed", "TestStreamActor", "String")
            .unwrap();

        let stream = StreamId::new("orders/processed", "a1").unwrap();
        let delivered = broker
            .publish(&stream, StreamMessage::from_text("test-message"))
            .await
            .unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(factory.activation_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_delivers_nothing() {
        let factory = test_factory();
        let broker = StreamBroker::new(Arc::clone(&factory));
        let stream = StreamId::new("empty", "a1").unwrap();
        let delivered = broker
            .publish(&stream, StreamMessage::from_text("m"))
            .await
            .unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(factory.activation_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_handle_publish_and_subscribe() {
        let factory = test_factory();
        let broker = Arc::new(StreamBroker::new(factory));
        let provider = StreamProvider::new(Arc::clone(&broker));

        let seen = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);

        let handle = provider.get_stream(StreamId::new("metrics", "m1").unwrap());
        handle.subscribe(Arc::new(move |message, _stream| {
            sink.lock()
                .push(String::from_utf8_lossy(&message.payload).into_owned());
        }));

        handle.publish(StreamMessage::from_text("one")).await.unwrap();
        handle.publish(StreamMessage::from_text("two")).await.unwrap();

        // A different key on the same namespace does not reach the handler
        let other = provider.get_stream(StreamId::new("metrics", "m2").unwrap());
        other.publish(StreamMessage::from_text("three")).await.unwrap();

        assert_eq!(*seen.lock(), vec!["one", "two"]);
    }

    #[test]
    fn test_global_slot_contract() {
        // Grouped into one test: the slot is process-wide state.
        clear_broker();
        assert!(current_broker().is_none());

        assert!(matches!(set_broker(None), Err(StreamError::NullBroker)));
        assert!(current_broker().is_none());

        let broker = Arc::new(StreamBroker::new(test_factory()));
        set_broker(Some(Arc::clone(&broker))).unwrap();
        assert!(Arc::ptr_eq(&current_broker().unwrap(), &broker));

        clear_broker();
        assert!(current_broker().is_none());
    }
}
