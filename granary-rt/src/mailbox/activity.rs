// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use dashmap::DashMap;

// Layer 3: Internal module imports
// (none)

/// Observer of per-actor mailbox activity.
///
/// The mailbox calls `record_enqueued` on every accepted post and
/// `remove_actor` exactly once on disposal; the activation worker calls
/// `record_processed` after each handled message.
pub trait ActivityTracker: Send + Sync {
    /// An accepted enqueue for the actor.
    fn record_enqueued(&self, actor_id: &str, actor_type: &str);

    /// A completed message for the actor.
    fn record_processed(&self, actor_id: &str, actor_type: &str);

    /// The actor's mailbox was disposed.
    fn remove_actor(&self, actor_id: &str);
}

/// Point-in-time activity for one actor.
#[derive(Debug, Clone)]
pub struct ActorActivity {
    pub actor_type: String,
    pub enqueued: u64,
    pub processed: u64,
    pub last_activity: DateTime<Utc>,
}

/// In-memory [`ActivityTracker`] with per-actor counters.
pub struct InMemoryActivityTracker {
    actors: DashMap<String, ActorActivity>,
}

impl InMemoryActivityTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            actors: DashMap::new(),
        }
    }

    /// Snapshot of one actor's counters, if tracked.
    pub fn snapshot(&self, actor_id: &str) -> Option<ActorActivity> {
        self.actors.get(actor_id).map(|entry| entry.clone())
    }

    /// Number of currently tracked actors.
    pub fn tracked_count(&self) -> usize {
        self.actors.len()
    }
}

impl Default for InMemoryActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTracker for InMemoryActivityTracker {
    fn record_enqueued(&self, actor_id: &str, actor_type: &str) {
        let mut entry = self
            .actors
            .entry(actor_id.to_owned())
            .or_insert_with(|| ActorActivity {
                actor_type: actor_type.to_owned(),
                enqueued: 0,
                processed: 0,
                last_activity: Utc::now(),
            });
        entry.enqueued += 1;
        entry.last_activity = Utc::now();
    }

    fn record_processed(&self, actor_id: &str, actor_type: &str) {
        let mut entry = self
            .actors
            .entry(actor_id.to_owned())
            .or_insert_with(|| ActorActivity {
                actor_type: actor_type.to_owned(),
                enqueued: 0,
                processed: 0,
                last_activity: Utc::now(),
            });
        entry.processed += 1;
        entry.last_activity = Utc::now();
    }

    fn remove_actor(&self, actor_id: &str) {
        self.actors.remove(actor_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_process_counters() {
        let tracker = InMemoryActivityTracker::new();
        tracker.record_enqueued("a1", "Worker");
        tracker.record_enqueued("a1", "Worker");
        tracker.record_processed("a1", "Worker");

        let snapshot = tracker.snapshot("a1").unwrap();
        assert_eq!(snapshot.enqueued, 2);
        assert_eq!(snapshot.processed, 1);
        assert_eq!(snapshot.actor_type, "Worker");
    }

    #[test]
    fn test_remove_actor_clears_entry() {
        let tracker = InMemoryActivityTracker::new();
        tracker.record_enqueued("a1", "Worker");
        assert_eq!(tracker.tracked_count(), 1);
        tracker.remove_actor("a1");
        assert!(tracker.snapshot("a1").is_none());
        assert_eq!(tracker.tracked_count(), 0);
    }

    #[test]
    fn test_untracked_actor_is_none() {
        let tracker = InMemoryActivityTracker::new();
        assert!(tracker.snapshot("ghost").is_none());
    }
}
