// Layer 1: Standard library imports
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

// Layer 3: Internal module imports
use super::in_memory::InMemoryStateStore;
use super::{StateStore, StorageError};

/// Provider name used when actors do not name one explicitly.
pub const DEFAULT_STORAGE_PROVIDER: &str = "memory";

type StoreFactory = Box<dyn Fn() -> Arc<dyn StateStore> + Send + Sync>;

/// Process-wide registry of storage providers.
///
/// Factories are keyed by provider name; `get` memoizes one store
/// instance per `(provider name, state type)`, so repeated lookups with
/// the same pair observe the same instance, and different provider names
/// observe different instances. A name with no registered factory falls
/// back to [`InMemoryStateStore`].
///
/// # Example
/// ```rust
/// use granary_rt::storage::StorageProviderRegistry;
///
/// let registry = StorageProviderRegistry::new();
/// let a = registry.get::<u64>("memory");
/// let b = registry.get::<u64>("memory");
/// assert!(a.shares_store_with(&b));
/// ```
pub struct StorageProviderRegistry {
    factories: DashMap<String, StoreFactory>,
    instances: DashMap<(String, TypeId), Arc<dyn StateStore>>,
}

impl StorageProviderRegistry {
    /// Create a registry with no factories registered.
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
            instances: DashMap::new(),
        }
    }

    /// Register (or replace) the factory for a provider name.
    ///
    /// Already-memoized instances are unaffected; the factory applies to
    /// `(name, type)` pairs first requested after this call.
    pub fn register_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn StateStore> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// The memoized storage for `(name, T)`.
    pub fn get<T: 'static>(&self, name: &str) -> TypedStateStorage<T> {
        let key = (name.to_owned(), TypeId::of::<T>());
        let store = self
            .instances
            .entry(key)
            .or_insert_with(|| match self.factories.get(name) {
                Some(factory) => factory(),
                None => Arc::new(InMemoryStateStore::new()),
            })
            .clone();
        TypedStateStorage::new(store)
    }

    /// The memoized storage for `(DEFAULT_STORAGE_PROVIDER, T)`.
    pub fn default_storage<T: 'static>(&self) -> TypedStateStorage<T> {
        self.get(DEFAULT_STORAGE_PROVIDER)
    }
}

impl Default for StorageProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed facade over a raw [`StateStore`]: the state API actors see.
///
/// Serde round-trips the state value through the store's JSON value
/// model; versions and guards pass straight through.
pub struct TypedStateStorage<T> {
    store: Arc<dyn StateStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedStateStorage<T> {
    fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Whether two facades share the same underlying store instance.
    pub fn shares_store_with<U>(&self, other: &TypedStateStorage<U>) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

impl<T> Clone for TypedStateStorage<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> TypedStateStorage<T> {
    /// Save a state object, returning the new version.
    pub async fn save_with_version(
        &self,
        actor_id: &str,
        state_name: &str,
        state: &T,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError>
    where
        T: Serialize,
    {
        let value = serde_json::to_value(state)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.store
            .save(actor_id, state_name, value, expected_version)
            .await
    }

    /// Load a state object with its current version.
    pub async fn load_with_version(
        &self,
        actor_id: &str,
        state_name: &str,
    ) -> Result<Option<(T, u64)>, StorageError>
    where
        T: DeserializeOwned,
    {
        match self.store.load(actor_id, state_name).await? {
            Some((value, version)) => {
                let state = serde_json::from_value(value)
                    .map_err(|err| StorageError::Serialization(err.to_string()))?;
                Ok(Some((state, version)))
            }
            None => Ok(None),
        }
    }

    /// Delete a state object, optionally guarded by a version.
    pub async fn delete(
        &self,
        actor_id: &str,
        state_name: &str,
        expected_version: Option<u64>,
    ) -> Result<(), StorageError> {
        self.store
            .delete(actor_id, state_name, expected_version)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Balance {
        amount: i64,
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let registry = StorageProviderRegistry::new();
        let storage = registry.get::<Balance>("memory");

        let version = storage
            .save_with_version("a1", "balance", &Balance { amount: 10 }, None)
            .await
            .unwrap();
        assert_eq!(version, 1);

        let (state, loaded_version) = storage
            .load_with_version("a1", "balance")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state, Balance { amount: 10 });
        assert_eq!(loaded_version, 1);
    }

    #[test]
    fn test_same_name_and_type_memoized() {
        let registry = StorageProviderRegistry::new();
        let a = registry.get::<Balance>("memory");
        let b = registry.get::<Balance>("memory");
        assert!(a.shares_store_with(&b));
    }

    #[test]
    fn test_different_provider_names_distinct() {
        let registry = StorageProviderRegistry::new();
        let a = registry.get::<Balance>("memory");
        let b = registry.get::<Balance>("redis-shadow");
        assert!(!a.shares_store_with(&b));
    }

    #[test]
    fn test_different_types_distinct() {
        let registry = StorageProviderRegistry::new();
        let a = registry.get::<Balance>("memory");
        let b = registry.get::<u64>("memory");
        assert!(!a.shares_store_with(&b));
    }

    #[tokio::test]
    async fn test_registered_factory_used() {
        let registry = StorageProviderRegistry::new();
        let shared: Arc<InMemoryStateStore> = Arc::new(InMemoryStateStore::new());
        let handle = Arc::clone(&shared);
        registry.register_factory("custom", move || {
            Arc::clone(&handle) as Arc<dyn StateStore>
        });

        let storage = registry.get::<Balance>("custom");
        storage
            .save_with_version("a1", "s", &Balance { amount: 1 }, None)
            .await
            .unwrap();
        assert_eq!(shared.len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_through_facade() {
        let registry = StorageProviderRegistry::new();
        let storage = registry.get::<Balance>("memory");
        storage
            .save_with_version("a1", "s", &Balance { amount: 1 }, None)
            .await
            .unwrap();
        let err = storage
            .save_with_version("a1", "s", &Balance { amount: 2 }, Some(5))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ConcurrencyConflict { .. }));
    }
}
