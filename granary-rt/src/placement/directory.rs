// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Where the cluster believes each actor currently lives.
///
/// This is the contract placement consumes from the cluster directory; the
/// real directory is an external collaborator, the in-memory
/// implementation serves single-process runs and tests.
pub trait ActorDirectory: Send + Sync {
    /// The silo hosting the actor, if any placement is known.
    fn lookup(&self, actor_id: &str) -> Option<SiloId>;

    /// Record the actor's current silo.
    fn record(&self, actor_id: &str, silo: SiloId);

    /// Drop the actor's placement record.
    fn forget(&self, actor_id: &str);
}

/// DashMap-backed [`ActorDirectory`].
pub struct InMemoryDirectory {
    placements: DashMap<String, SiloId>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            placements: DashMap::new(),
        }
    }

    /// Number of recorded placements.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether the directory holds no placements.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorDirectory for InMemoryDirectory {
    fn lookup(&self, actor_id: &str) -> Option<SiloId> {
        self.placements.get(actor_id).map(|entry| entry.clone())
    }

    fn record(&self, actor_id: &str, silo: SiloId) {
        self.placements.insert(actor_id.to_owned(), silo);
    }

    fn forget(&self, actor_id: &str) {
        self.placements.remove(actor_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lookup_forget() {
        let directory = InMemoryDirectory::new();
        assert!(directory.lookup("a1").is_none());

        directory.record("a1", SiloId::new("s1"));
        assert_eq!(directory.lookup("a1"), Some(SiloId::new("s1")));

        directory.record("a1", SiloId::new("s2"));
        assert_eq!(directory.lookup("a1"), Some(SiloId::new("s2")));

        directory.forget("a1");
        assert!(directory.lookup("a1").is_none());
    }
}
