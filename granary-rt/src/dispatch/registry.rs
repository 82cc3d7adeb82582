// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use crate::actor::{ActorError, VirtualActor};

/// Dispatch error types.
///
/// Argument-shaped failures (wrong actor type, unknown dispatcher) and
/// operation-shaped failures (unknown method, duplicate registration) are
/// surfaced to the caller and never retried; method failures feed the
/// retry/dead-letter path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The actor instance is not of the dispatcher's registered type
    #[error("Actor is not of registered type '{type_name}'")]
    WrongActorType { type_name: String },

    /// No dispatcher is registered for the type
    #[error("No dispatcher registered for actor type '{0}'")]
    UnknownType(String),

    /// The method name is not registered for the type
    #[error("Method '{method}' is not registered for actor type '{type_name}'")]
    UnknownMethod { type_name: String, method: String },

    /// A `(type, method)` pair was registered twice
    #[error("Method '{method}' is already registered for actor type '{type_name}'")]
    DuplicateMethod { type_name: String, method: String },

    /// A dispatcher for the type was registered twice
    #[error("Dispatcher for actor type '{0}' is already registered")]
    DuplicateType(String),

    /// The caller's cancellation token tripped
    #[error("Invocation was cancelled")]
    Cancelled,

    /// User code inside the method raised an error
    #[error("Actor method '{method}' failed: {reason}")]
    MethodFailure { method: String, reason: String },
}

/// What a registered method body returns: the serialized response, or an
/// erased user error. Void methods return empty bytes.
pub type MethodResult = Result<Bytes, ActorError>;

type MethodFn<T> = Box<
    dyn for<'a> Fn(&'a mut T, Bytes, CancellationToken) -> BoxFuture<'a, MethodResult>
        + Send
        + Sync,
>;

/// Per-type table from method name to `(deserialize, invoke, serialize)`
/// closure. This is the surface generated dispatchers register against.
///
/// # Example
/// ```rust
/// use granary_rt::actor::VirtualActor;
/// use granary_rt::dispatch::MethodTable;
/// use async_trait::async_trait;
/// use bytes::Bytes;
///
/// struct EchoActor;
///
/// #[async_trait]
/// impl VirtualActor for EchoActor {}
///
/// let mut table = MethodTable::<EchoActor>::new();
/// table
///     .register("Echo", |_actor, payload, _cancel| {
///         Box::pin(async move { Ok(payload) })
///     })
///     .unwrap();
/// assert!(table.contains("Echo"));
/// ```
pub struct MethodTable<T> {
    methods: HashMap<String, MethodFn<T>>,
}

impl<T: VirtualActor> MethodTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a method body. Registration is append-only; a duplicate
    /// name fails with [`DispatchError::DuplicateMethod`].
    pub fn register<F>(&mut self, method: &str, body: F) -> Result<(), DispatchError>
    where
        F: for<'a> Fn(&'a mut T, Bytes, CancellationToken) -> BoxFuture<'a, MethodResult>
            + Send
            + Sync
            + 'static,
    {
        if self.methods.contains_key(method) {
            return Err(DispatchError::DuplicateMethod {
                type_name: std::any::type_name::<T>().to_owned(),
                method: method.to_owned(),
            });
        }
        self.methods.insert(method.to_owned(), Box::new(body));
        Ok(())
    }

    /// Whether a method name is registered.
    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Registered method names, unordered.
    pub fn method_names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }
}

impl<T: VirtualActor> Default for MethodTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability set of one actor type's dispatcher: invoke by name, list
/// methods. Variants are the per-type generated implementations.
#[async_trait]
pub trait ActorDispatcher: Send + Sync {
    /// The actor type this dispatcher serves.
    fn type_name(&self) -> &str;

    /// Registered method names, unordered.
    fn method_names(&self) -> Vec<String>;

    /// Deserialize, invoke, and serialize one method call.
    ///
    /// The caller's token is propagated into the method body and also
    /// races the invocation itself.
    async fn invoke(
        &self,
        actor: &mut dyn VirtualActor,
        method: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> Result<Bytes, DispatchError>;
}

/// The generated-dispatcher shape: a [`MethodTable`] bound to a type name.
pub struct TypedDispatcher<T> {
    type_name: String,
    table: MethodTable<T>,
}

impl<T: VirtualActor> TypedDispatcher<T> {
    /// Bind a method table to a cluster-stable type name.
    pub fn new(type_name: impl Into<String>, table: MethodTable<T>) -> Self {
        Self {
            type_name: type_name.into(),
            table,
        }
    }
}

#[async_trait]
impl<T: VirtualActor> ActorDispatcher for TypedDispatcher<T> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn method_names(&self) -> Vec<String> {
        self.table.method_names()
    }

    async fn invoke(
        &self,
        actor: &mut dyn VirtualActor,
        method: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> Result<Bytes, DispatchError> {
        let body = self
            .table
            .methods
            .get(method)
            .ok_or_else(|| DispatchError::UnknownMethod {
                type_name: self.type_name.clone(),
                method: method.to_owned(),
            })?;
        let actor = actor
            .downcast_mut::<T>()
            .ok_or_else(|| DispatchError::WrongActorType {
                type_name: self.type_name.clone(),
            })?;

        let invocation = body(actor, payload, cancel.clone());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DispatchError::Cancelled),
            result = invocation => result.map_err(|err| DispatchError::MethodFailure {
                method: method.to_owned(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Process-wide registry from actor type name to dispatcher.
///
/// Installed before first activation by the module-init hook the code
/// generator emits; never replaced at steady state. Reads are lock-free;
/// registration serializes on the map shard.
pub struct DispatcherRegistry {
    dispatchers: DashMap<String, Arc<dyn ActorDispatcher>>,
}

impl DispatcherRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            dispatchers: DashMap::new(),
        }
    }

    /// Register a dispatcher under its type name. Append-only.
    pub fn register(&self, dispatcher: Arc<dyn ActorDispatcher>) -> Result<(), DispatchError> {
        let type_name = dispatcher.type_name().to_owned();
        match self.dispatchers.entry(type_name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(DispatchError::DuplicateType(type_name))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(dispatcher);
                Ok(())
            }
        }
    }

    /// Convenience: bind a table to a type name and register it.
    pub fn register_table<T: VirtualActor>(
        &self,
        type_name: &str,
        table: MethodTable<T>,
    ) -> Result<(), DispatchError> {
        self.register(Arc::new(TypedDispatcher::new(type_name, table)))
    }

    /// Look up the dispatcher for a type.
    pub fn get(&self, type_name: &str) -> Option<Arc<dyn ActorDispatcher>> {
        self.dispatchers.get(type_name).map(|d| Arc::clone(&d))
    }

    /// Invoke `method` on `actor`, routed by type name.
    pub async fn invoke(
        &self,
        type_name: &str,
        actor: &mut dyn VirtualActor,
        method: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> Result<Bytes, DispatchError> {
        let dispatcher = self
            .get(type_name)
            .ok_or_else(|| DispatchError::UnknownType(type_name.to_owned()))?;
        dispatcher.invoke(actor, method, payload, cancel).await
    }

    /// Number of registered types.
    pub fn type_count(&self) -> usize {
        self.dispatchers.len()
    }
}

impl Default for DispatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MailboxTestActor {
        calls: u32,
    }

    #[async_trait]
    impl VirtualActor for MailboxTestActor {}

    struct OtherActor;

    #[async_trait]
    impl VirtualActor for OtherActor {}

    fn test_table() -> MethodTable<MailboxTestActor> {
        let mut table = MethodTable::new();
        table
            .register("TestMethod", |actor: &mut MailboxTestActor, _payload, _cancel| {
                Box::pin(async move {
                    actor.calls += 1;
                    Ok(Bytes::from_static(b"test result"))
                })
            })
            .unwrap();
        table
            .register("FailMethod", |_actor, _payload, _cancel| {
                Box::pin(async move { Err("intentional failure".into()) })
            })
            .unwrap();
        table
            .register("VoidMethod", |_actor, _payload, _cancel| {
                Box::pin(async move { Ok(Bytes::new()) })
            })
            .unwrap();
        table
    }

    #[tokio::test]
    async fn test_invoke_returns_response_bytes() {
        let registry = DispatcherRegistry::new();
        registry
            .register_table("MailboxTestActor", test_table())
            .unwrap();

        let mut actor = MailboxTestActor { calls: 0 };
        let response = registry
            .invoke(
                "MailboxTestActor",
                &mut actor,
                "TestMethod",
                Bytes::new(),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(&response[..], b"test result");
        assert_eq!(actor.calls, 1);
    }

    #[tokio::test]
    async fn test_void_method_returns_empty_bytes() {
        let registry = DispatcherRegistry::new();
        registry
            .register_table("MailboxTestActor", test_table())
            .unwrap();

        let mut actor = MailboxTestActor { calls: 0 };
        let response = registry
            .invoke(
                "MailboxTestActor",
                &mut actor,
                "VoidMethod",
                Bytes::new(),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_method_is_invalid_operation() {
        let registry = DispatcherRegistry::new();
        registry
            .register_table("MailboxTestActor", test_table())
            .unwrap();

        let mut actor = MailboxTestActor { calls: 0 };
        let err = registry
            .invoke(
                "MailboxTestActor",
                &mut actor,
                "NoSuchMethod",
                Bytes::new(),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownMethod { .. }));
    }

    #[tokio::test]
    async fn test_unknown_type_is_invalid_argument() {
        let registry = DispatcherRegistry::new();
        let mut actor = MailboxTestActor { calls: 0 };
        let err = registry
            .invoke(
                "Unregistered",
                &mut actor,
                "TestMethod",
                Bytes::new(),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownType("Unregistered".to_owned()));
    }

    #[tokio::test]
    async fn test_wrong_actor_type_rejected() {
        let registry = DispatcherRegistry::new();
        registry
            .register_table("MailboxTestActor", test_table())
            .unwrap();

        let mut actor = OtherActor;
        let err = registry
            .invoke(
                "MailboxTestActor",
                &mut actor,
                "TestMethod",
                Bytes::new(),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::WrongActorType { .. }));
    }

    #[tokio::test]
    async fn test_method_failure_carries_reason() {
        let registry = DispatcherRegistry::new();
        registry
            .register_table("MailboxTestActor", test_table())
            .unwrap();

        let mut actor = MailboxTestActor { calls: 0 };
        let err = registry
            .invoke(
                "MailboxTestActor",
                &mut actor,
                "FailMethod",
                Bytes::new(),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        match err {
            DispatchError::MethodFailure { method, reason } => {
                assert_eq!(method, "FailMethod");
                assert!(reason.contains("intentional failure"));
            }
            other => panic!("expected MethodFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let registry = DispatcherRegistry::new();
        registry
            .register_table("MailboxTestActor", test_table())
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut actor = MailboxTestActor { calls: 0 };
        let err = registry
            .invoke(
                "MailboxTestActor",
                &mut actor,
                "TestMethod",
                Bytes::new(),
                cancel,
            )
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::Cancelled);
        assert_eq!(actor.calls, 0);
    }

    #[test]
    fn test_duplicate_method_registration_rejected() {
        let mut table = MethodTable::<MailboxTestActor>::new();
        table
            .register("M", |_a, _p, _c| Box::pin(async { Ok(Bytes::new()) }))
            .unwrap();
        let err = table
            .register("M", |_a, _p, _c| Box::pin(async { Ok(Bytes::new()) }))
            .unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateMethod { .. }));
    }

    #[test]
    fn test_duplicate_type_registration_rejected() {
        let registry = DispatcherRegistry::new();
        registry
            .register_table("MailboxTestActor", test_table())
            .unwrap();
        let err = registry
            .register_table("MailboxTestActor", test_table())
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::DuplicateType("MailboxTestActor".to_owned())
        );
    }

    #[test]
    fn test_method_names_listed() {
        let registry = DispatcherRegistry::new();
        registry
            .register_table("MailboxTestActor", test_table())
            .unwrap();
        let dispatcher = registry.get("MailboxTestActor").unwrap();
        let mut names = dispatcher.method_names();
        names.sort();
        assert_eq!(names, vec!["FailMethod", "TestMethod", "VoidMethod"]);
    }
}
