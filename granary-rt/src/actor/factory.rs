// Layer 1: Standard library imports
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::oneshot;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::activation::Activation;
use super::supervision::{ChildFailureContext, SupervisionDirective};
use super::traits::{ActivationContext, VirtualActor};
use crate::dispatch::DispatcherRegistry;
use crate::dlq::{DeadLetterQueue, DeadLetterQueueOptions};
use crate::mailbox::{ActivityTracker, AdaptiveMailboxOptions, Mailbox, DEFAULT_MAILBOX_CAPACITY};
use crate::message::Envelope;
use crate::storage::StorageProviderRegistry;
use crate::util::{ActorIdentity, IdentityError};

/// Factory error types.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// The identity was malformed (empty id, empty type name)
    #[error(transparent)]
    InvalidIdentity(#[from] IdentityError),

    /// No constructor registered for the actor type
    #[error("No actor type '{0}' is registered in the catalog")]
    UnknownType(String),

    /// The activation callback failed; nothing stays registered
    #[error("Activation of {identity} failed: {reason}")]
    ActivationFailed { identity: String, reason: String },
}

type ActorConstructor = Box<dyn Fn(&ActorIdentity) -> Box<dyn VirtualActor> + Send + Sync>;

/// Registry of actor-type constructors.
///
/// The module-init hook emitted by the code generator registers one
/// constructor per actor type before first use; tests register closures
/// by hand.
pub struct ActorCatalog {
    constructors: DashMap<String, ActorConstructor>,
}

impl ActorCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            constructors: DashMap::new(),
        }
    }

    /// Register the constructor for an actor type. A repeat registration
    /// replaces the previous constructor.
    pub fn register<F>(&self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn(&ActorIdentity) -> Box<dyn VirtualActor> + Send + Sync + 'static,
    {
        self.constructors
            .insert(type_name.into(), Box::new(constructor));
    }

    /// Whether the type is known.
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    fn construct(&self, identity: &ActorIdentity) -> Result<Box<dyn VirtualActor>, FactoryError> {
        let constructor = self
            .constructors
            .get(identity.type_name())
            .ok_or_else(|| FactoryError::UnknownType(identity.type_name().to_owned()))?;
        Ok(constructor(identity))
    }
}

impl Default for ActorCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// The single point of per-identity uniqueness on a silo.
///
/// `get_or_create` registers at most one activation per `(type, id)`;
/// `create` constructs throwaway activations the caller owns. Supervision
/// relations registered through [`register_child`] are identity lookups,
/// never ownership. Finish construction with [`shared`], which hands the
/// factory the self-reference its activations report failures through.
///
/// [`register_child`]: ActorFactory::register_child
/// [`shared`]: ActorFactory::shared
pub struct ActorFactory {
    catalog: ActorCatalog,
    dispatchers: Arc<DispatcherRegistry>,
    storage: Arc<StorageProviderRegistry>,
    activations: DashMap<ActorIdentity, Arc<Activation>>,
    parents: DashMap<ActorIdentity, ActorIdentity>,
    dead_letter_queues: DashMap<String, Arc<DeadLetterQueue>>,
    dlq_options: DeadLetterQueueOptions,
    tracker: Option<Arc<dyn ActivityTracker>>,
    adaptive: AdaptiveMailboxOptions,
    mailbox_capacity: usize,
    self_handle: RwLock<Weak<ActorFactory>>,
}

impl ActorFactory {
    /// Create a factory over a catalog, dispatcher registry, and storage.
    pub fn new(
        catalog: ActorCatalog,
        dispatchers: Arc<DispatcherRegistry>,
        storage: Arc<StorageProviderRegistry>,
    ) -> Self {
        Self {
            catalog,
            dispatchers,
            storage,
            activations: DashMap::new(),
            parents: DashMap::new(),
            dead_letter_queues: DashMap::new(),
            dlq_options: DeadLetterQueueOptions::default(),
            tracker: None,
            adaptive: AdaptiveMailboxOptions::default(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            self_handle: RwLock::new(Weak::new()),
        }
    }

    /// Finish construction: wrap the factory in an `Arc` and record the
    /// self-reference used for supervision callbacks.
    pub fn shared(self) -> Arc<Self> {
        let factory = Arc::new(self);
        *factory.self_handle.write() = Arc::downgrade(&factory);
        factory
    }

    /// Builder method: dead-letter configuration.
    pub fn with_dead_letter_options(mut self, options: DeadLetterQueueOptions) -> Self {
        self.dlq_options = options;
        self
    }

    /// Builder method: activity tracker attached to every mailbox.
    pub fn with_tracker(mut self, tracker: Arc<dyn ActivityTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Builder method: adaptive-mailbox parameters.
    pub fn with_adaptive_mailboxes(mut self, options: AdaptiveMailboxOptions) -> Self {
        self.adaptive = options;
        self
    }

    /// Builder method: fixed mailbox capacity.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// The catalog backing this factory.
    pub fn catalog(&self) -> &ActorCatalog {
        &self.catalog
    }

    /// The dead-letter queue serving an actor type, if enabled for it.
    pub fn dead_letter_queue(&self, type_name: &str) -> Option<Arc<DeadLetterQueue>> {
        let effective = self.dlq_options.effective_for(type_name);
        if !effective.enabled {
            return None;
        }
        let queue = self
            .dead_letter_queues
            .entry(type_name.to_owned())
            .or_insert_with(|| Arc::new(DeadLetterQueue::new(type_name, &effective)))
            .clone();
        Some(queue)
    }

    fn build_activation(&self, identity: ActorIdentity) -> Result<Arc<Activation>, FactoryError> {
        let actor = self.catalog.construct(&identity)?;
        let effective = self.dlq_options.effective_for(identity.type_name());
        let dead_letters = self.dead_letter_queue(identity.type_name());

        let mut builder = Mailbox::builder(identity.type_name(), identity.actor_id())
            .capacity(self.mailbox_capacity)
            .adaptive(self.adaptive.clone());
        if let Some(tracker) = &self.tracker {
            builder = builder.tracker(Arc::clone(tracker));
        }
        if let Some(queue) = &dead_letters {
            builder = builder.dead_letters(Arc::clone(queue));
        }
        let mailbox = builder.build();

        let context = ActivationContext::new(identity.clone(), Arc::clone(&self.storage));
        Ok(Activation::new(
            identity,
            actor,
            mailbox,
            context,
            Arc::clone(&self.dispatchers),
            effective.retry_policy,
            dead_letters,
            self.self_handle.read().clone(),
        ))
    }

    /// Construct a fresh, unregistered, not-yet-activated activation.
    ///
    /// Fails with an invalid-argument error when the id is empty or
    /// whitespace. The caller owns the result; it never enters the
    /// identity map.
    pub fn create(&self, type_name: &str, actor_id: &str) -> Result<Arc<Activation>, FactoryError> {
        let identity = ActorIdentity::new(type_name, actor_id)?;
        self.build_activation(identity)
    }

    /// Return the registered activation for `(type, id)`, atomically
    /// creating, registering, and activating one when absent. Two
    /// concurrent callers observe the same instance. Activation failure
    /// leaves no entry registered.
    pub async fn get_or_create(
        &self,
        type_name: &str,
        actor_id: &str,
    ) -> Result<Arc<Activation>, FactoryError> {
        let identity = ActorIdentity::new(type_name, actor_id)?;
        let activation = match self.activations.entry(identity.clone()) {
            dashmap::mapref::entry::Entry::Occupied(slot) => Arc::clone(slot.get()),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let fresh = self.build_activation(identity.clone())?;
                slot.insert(Arc::clone(&fresh));
                fresh
            }
        };
        if let Err(err) = activation.activate().await {
            self.activations
                .remove_if(&identity, |_, value| Arc::ptr_eq(value, &activation));
            return Err(err);
        }
        Ok(activation)
    }

    /// The registered activation for an identity, if any.
    pub fn get(&self, identity: &ActorIdentity) -> Option<Arc<Activation>> {
        self.activations
            .get(identity)
            .map(|entry| Arc::clone(&entry))
    }

    /// Run an activation's activation callback and start its worker.
    pub async fn activate(&self, activation: &Arc<Activation>) -> Result<(), FactoryError> {
        activation.activate().await
    }

    /// Deactivate an activation and drop its registration, if it holds one.
    pub async fn deactivate(&self, activation: &Arc<Activation>) {
        self.activations
            .remove_if(activation.identity(), |_, value| {
                Arc::ptr_eq(value, activation)
            });
        activation.deactivate().await;
    }

    /// Deactivate whatever activation is registered for an identity.
    pub async fn deactivate_identity(&self, identity: &ActorIdentity) {
        if let Some((_, activation)) = self.activations.remove(identity) {
            activation.deactivate().await;
        }
    }

    /// Deactivate and re-activate an identity, creating a fresh instance.
    pub async fn restart(&self, identity: &ActorIdentity) -> Result<Arc<Activation>, FactoryError> {
        debug!(identity = %identity, "restarting activation");
        self.deactivate_identity(identity).await;
        self.get_or_create(identity.type_name(), identity.actor_id())
            .await
    }

    /// Number of registered activations.
    pub fn activation_count(&self) -> usize {
        self.activations.len()
    }

    /// Deactivate every registered activation (silo shutdown).
    pub async fn deactivate_all(&self) {
        let identities: Vec<ActorIdentity> = self
            .activations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for identity in identities {
            self.deactivate_identity(&identity).await;
        }
    }

    /// Record that `parent` supervises `child`. The relation is a lookup
    /// by identity; activation lifetime stays with the factory.
    pub fn register_child(&self, parent: &ActorIdentity, child: &ActorIdentity) {
        self.parents.insert(child.clone(), parent.clone());
    }

    /// Whether the identity has a registered supervisor.
    pub fn has_parent(&self, identity: &ActorIdentity) -> bool {
        self.parents.contains_key(identity)
    }

    /// Called by workers on a terminal method failure of a supervised
    /// actor. Runs supervision on a detached task so the failing worker
    /// never waits on its own deactivation.
    pub(crate) fn notify_child_failure(
        &self,
        child: ActorIdentity,
        error: String,
        failure_count: u32,
    ) {
        if !self.parents.contains_key(&child) {
            return;
        }
        let Some(factory) = self.self_handle.read().upgrade() else {
            return;
        };
        tokio::spawn(async move {
            factory
                .apply_supervision(child, error, failure_count)
                .await;
        });
    }

    /// Ask the supervisor chain for a directive and apply it. Escalation
    /// climbs to the next ancestor; a chain that ends without an answer
    /// falls back to the default restart directive.
    async fn apply_supervision(
        self: Arc<Self>,
        child: ActorIdentity,
        error: String,
        failure_count: u32,
    ) {
        let mut subject = child.clone();
        let directive = loop {
            let parent = match self.parents.get(&subject) {
                Some(entry) => entry.clone(),
                None => break SupervisionDirective::Restart,
            };
            let Some(parent_activation) = self.get(&parent) else {
                break SupervisionDirective::Restart;
            };
            let (respond, answer) = oneshot::channel();
            let context = ChildFailureContext::new(child.clone(), error.clone(), failure_count);
            if !parent_activation.mailbox().post(Envelope::ChildFailure {
                context,
                respond,
            }) {
                break SupervisionDirective::Restart;
            }
            match answer.await {
                Ok(SupervisionDirective::Escalate) => {
                    subject = parent;
                }
                Ok(directive) => break directive,
                Err(_) => break SupervisionDirective::Restart,
            }
        };

        debug!(child = %child, %directive, "applying supervision directive");
        match directive {
            SupervisionDirective::Restart => {
                if let Err(err) = self.restart(&child).await {
                    warn!(child = %child, error = %err, "supervised restart failed");
                }
            }
            SupervisionDirective::Stop => self.deactivate_identity(&child).await,
            SupervisionDirective::Resume | SupervisionDirective::Escalate => {}
        }
    }
}
