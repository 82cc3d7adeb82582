// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

// Layer 3: Internal module imports
use super::{StateStore, StorageError};

/// In-memory versioned state store.
///
/// The default store supplied when a provider name has no registered
/// factory. Keys are `(actor_id, state_name)`; values carry a version
/// that starts at 1 and increments on every successful write.
pub struct InMemoryStateStore {
    entries: DashMap<(String, String), (Value, u64)>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored state objects, across all actors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no state objects.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn save(
        &self,
        actor_id: &str,
        state_name: &str,
        value: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        let key = (actor_id.to_owned(), state_name.to_owned());
        // Entry holds the shard lock, making check-and-write atomic.
        match self.entries.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                let current = slot.get().1;
                if let Some(expected) = expected_version {
                    if expected != current {
                        return Err(StorageError::ConcurrencyConflict {
                            actor_id: actor_id.to_owned(),
                            state_name: state_name.to_owned(),
                            expected: Some(expected),
                            found: Some(current),
                        });
                    }
                }
                let next = current + 1;
                slot.insert((value, next));
                Ok(next)
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                if let Some(expected) = expected_version {
                    return Err(StorageError::ConcurrencyConflict {
                        actor_id: actor_id.to_owned(),
                        state_name: state_name.to_owned(),
                        expected: Some(expected),
                        found: None,
                    });
                }
                slot.insert((value, 1));
                Ok(1)
            }
        }
    }

    async fn load(
        &self,
        actor_id: &str,
        state_name: &str,
    ) -> Result<Option<(Value, u64)>, StorageError> {
        let key = (actor_id.to_owned(), state_name.to_owned());
        Ok(self.entries.get(&key).map(|entry| entry.clone()))
    }

    async fn delete(
        &self,
        actor_id: &str,
        state_name: &str,
        expected_version: Option<u64>,
    ) -> Result<(), StorageError> {
        let key = (actor_id.to_owned(), state_name.to_owned());
        match self.entries.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(slot) => {
                if let Some(expected) = expected_version {
                    let current = slot.get().1;
                    if expected != current {
                        return Err(StorageError::ConcurrencyConflict {
                            actor_id: actor_id.to_owned(),
                            state_name: state_name.to_owned(),
                            expected: Some(expected),
                            found: Some(current),
                        });
                    }
                }
                slot.remove();
                Ok(())
            }
            dashmap::mapref::entry::Entry::Vacant(_) => {
                if let Some(expected) = expected_version {
                    return Err(StorageError::ConcurrencyConflict {
                        actor_id: actor_id.to_owned(),
                        state_name: state_name.to_owned(),
                        expected: Some(expected),
                        found: None,
                    });
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let store = InMemoryStateStore::new();
        let version = store
            .save("a1", "profile", json!({"name": "x"}), None)
            .await
            .unwrap();
        assert_eq!(version, 1);

        let (value, loaded_version) = store.load("a1", "profile").await.unwrap().unwrap();
        assert_eq!(value, json!({"name": "x"}));
        assert_eq!(loaded_version, 1);
    }

    #[tokio::test]
    async fn test_versions_increment() {
        let store = InMemoryStateStore::new();
        assert_eq!(store.save("a1", "s", json!(1), None).await.unwrap(), 1);
        assert_eq!(store.save("a1", "s", json!(2), None).await.unwrap(), 2);
        assert_eq!(store.save("a1", "s", json!(3), Some(2)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_version_mismatch_conflicts() {
        let store = InMemoryStateStore::new();
        store.save("a1", "s", json!(1), None).await.unwrap();
        let err = store.save("a1", "s", json!(2), Some(7)).await.unwrap_err();
        assert!(matches!(err, StorageError::ConcurrencyConflict { .. }));

        // Store unmodified by the failed write
        let (value, version) = store.load("a1", "s").await.unwrap().unwrap();
        assert_eq!(value, json!(1));
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_guarded_first_write_conflicts() {
        let store = InMemoryStateStore::new();
        let err = store.save("a1", "s", json!(1), Some(1)).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::ConcurrencyConflict { found: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let store = InMemoryStateStore::new();
        assert!(store.load("a1", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_with_guard() {
        let store = InMemoryStateStore::new();
        store.save("a1", "s", json!(1), None).await.unwrap();
        let err = store.delete("a1", "s", Some(9)).await.unwrap_err();
        assert!(matches!(err, StorageError::ConcurrencyConflict { .. }));

        store.delete("a1", "s", Some(1)).await.unwrap();
        assert!(store.load("a1", "s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_absent_unguarded_is_noop() {
        let store = InMemoryStateStore::new();
        store.delete("a1", "missing", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_actors_are_isolated() {
        let store = InMemoryStateStore::new();
        store.save("a1", "s", json!("one"), None).await.unwrap();
        store.save("a2", "s", json!("two"), None).await.unwrap();

        let (value, _) = store.load("a1", "s").await.unwrap().unwrap();
        assert_eq!(value, json!("one"));
    }
}
