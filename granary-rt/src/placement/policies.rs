// Layer 1: Standard library imports
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use rand::Rng;

// Layer 3: Internal module imports
use super::directory::ActorDirectory;
use super::locality::LocalityAnalyzer;
use super::ring::HashRing;
use crate::util::SiloId;

/// Placement error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// No candidate silo could host the actor; the caller re-resolves the
    /// candidate set and retries
    #[error("No silo available for {actor_type}/{actor_id}")]
    SiloUnavailable {
        actor_type: String,
        actor_id: String,
    },
}

/// Resolve a placement through a policy, surfacing an empty candidate
/// set as [`PlacementError::SiloUnavailable`].
pub fn place(
    policy: &dyn PlacementPolicy,
    actor_id: &str,
    actor_type: &str,
    candidates: &[SiloId],
) -> Result<SiloId, PlacementError> {
    policy
        .select_silo(actor_id, actor_type, candidates)
        .ok_or_else(|| PlacementError::SiloUnavailable {
            actor_type: actor_type.to_owned(),
            actor_id: actor_id.to_owned(),
        })
}

/// Selects a silo for `(actor_id, actor_type)` among the candidates.
///
/// Shared contract: the result is `None` iff `candidates` is empty.
pub trait PlacementPolicy: Send + Sync {
    /// Choose a candidate silo.
    fn select_silo(
        &self,
        actor_id: &str,
        actor_type: &str,
        candidates: &[SiloId],
    ) -> Option<SiloId>;
}

/// Uniform random placement.
pub struct RandomPlacement;

impl PlacementPolicy for RandomPlacement {
    fn select_silo(
        &self,
        _actor_id: &str,
        _actor_type: &str,
        candidates: &[SiloId],
    ) -> Option<SiloId> {
        if candidates.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..candidates.len());
        Some(candidates[index].clone())
    }
}

fn fallback_index(actor_id: &str, len: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    actor_id.hash(&mut hasher);
    (hasher.finish() % len as u64) as usize
}

/// Consistent-hash placement over a shared ring.
///
/// Returns the ring owner when it is a candidate; otherwise walks the
/// ring clockwise to the first candidate. Deterministic for a fixed ring
/// and candidate list. When the ring has no members at all, a stable hash
/// of the actor id picks among the candidates so determinism holds.
pub struct ConsistentHashPlacement {
    ring: Arc<HashRing>,
}

impl ConsistentHashPlacement {
    /// Place over the given ring.
    pub fn new(ring: Arc<HashRing>) -> Self {
        Self { ring }
    }
}

impl PlacementPolicy for ConsistentHashPlacement {
    fn select_silo(
        &self,
        actor_id: &str,
        _actor_type: &str,
        candidates: &[SiloId],
    ) -> Option<SiloId> {
        if candidates.is_empty() {
            return None;
        }
        for silo in self.ring.walk(actor_id) {
            if candidates.contains(&silo) {
                return Some(silo);
            }
        }
        Some(candidates[fallback_index(actor_id, candidates.len())].clone())
    }
}

/// Prefers the local silo; falls back to consistent hash.
pub struct LocalPreferredPlacement {
    local: SiloId,
    hash: ConsistentHashPlacement,
}

impl LocalPreferredPlacement {
    /// Prefer `local`, fall back to the ring.
    pub fn new(local: SiloId, ring: Arc<HashRing>) -> Self {
        Self {
            local,
            hash: ConsistentHashPlacement::new(ring),
        }
    }
}

impl PlacementPolicy for LocalPreferredPlacement {
    fn select_silo(
        &self,
        actor_id: &str,
        actor_type: &str,
        candidates: &[SiloId],
    ) -> Option<SiloId> {
        if candidates.contains(&self.local) {
            return Some(self.local.clone());
        }
        self.hash.select_silo(actor_id, actor_type, candidates)
    }
}

/// Round-robin placement for stateless workers.
///
/// A monotonically advancing counter is shared across calls, so over
/// `k * candidates.len()` placements each candidate receives exactly `k`.
/// Independent of the actor id.
pub struct StatelessWorkerPlacement {
    counter: AtomicUsize,
}

impl StatelessWorkerPlacement {
    /// Start the rotation at the first candidate.
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for StatelessWorkerPlacement {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementPolicy for StatelessWorkerPlacement {
    fn select_silo(
        &self,
        _actor_id: &str,
        _actor_type: &str,
        candidates: &[SiloId],
    ) -> Option<SiloId> {
        if candidates.is_empty() {
            return None;
        }
        let turn = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(candidates[turn % candidates.len()].clone())
    }
}

/// Tuning for locality-aware placement.
#[derive(Debug, Clone)]
pub struct LocalityPlacementOptions {
    /// How many hot peers to consider per actor
    pub max_hot_pairs: usize,
}

impl Default for LocalityPlacementOptions {
    fn default() -> Self {
        Self { max_hot_pairs: 16 }
    }
}

/// Places actors near the peers they talk to most.
///
/// Scores each candidate by the message-count weight of hot peers the
/// directory already places there; the highest score wins, ties break
/// randomly. With no edges for the actor, or no directory placements for
/// its peers, placement falls back to random.
pub struct LocalityAwarePlacement {
    analyzer: Arc<LocalityAnalyzer>,
    directory: Arc<dyn ActorDirectory>,
    options: LocalityPlacementOptions,
}

impl LocalityAwarePlacement {
    /// Place using the given analyzer and directory.
    pub fn new(
        analyzer: Arc<LocalityAnalyzer>,
        directory: Arc<dyn ActorDirectory>,
        options: LocalityPlacementOptions,
    ) -> Self {
        Self {
            analyzer,
            directory,
            options,
        }
    }
}

impl PlacementPolicy for LocalityAwarePlacement {
    fn select_silo(
        &self,
        actor_id: &str,
        actor_type: &str,
        candidates: &[SiloId],
    ) -> Option<SiloId> {
        if candidates.is_empty() {
            return None;
        }

        let mut scores: HashMap<&SiloId, u64> = HashMap::new();
        for (peer, weight) in self.analyzer.neighbors(actor_id, self.options.max_hot_pairs) {
            if let Some(silo) = self.directory.lookup(&peer) {
                if let Some(candidate) = candidates.iter().find(|c| **c == silo) {
                    *scores.entry(candidate).or_insert(0) += weight;
                }
            }
        }

        if scores.is_empty() {
            return RandomPlacement.select_silo(actor_id, actor_type, candidates);
        }

        let best = scores.values().copied().max().unwrap_or(0);
        let top: Vec<&SiloId> = scores
            .iter()
            .filter(|(_, score)| **score == best)
            .map(|(silo, _)| *silo)
            .collect();
        let index = if top.len() == 1 {
            0
        } else {
            rand::thread_rng().gen_range(0..top.len())
        };
        Some(top[index].clone())
    }
}
