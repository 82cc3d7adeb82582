// Layer 1: Standard library imports
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::{Mutex, RwLock};

// Layer 3: Internal module imports
use crate::util::SiloId;

/// Default number of virtual points each silo contributes.
pub const DEFAULT_VIRTUAL_NODES: usize = 100;

/// Immutable sorted point set; membership changes install a new snapshot.
struct RingSnapshot {
    /// `(hash, silo)` sorted ascending by hash
    points: Vec<(u64, SiloId)>,
}

fn hash_key(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Consistent-hash ring over silo ids.
///
/// Each member contributes `virtual_nodes` points; lookup of a key
/// returns the silo of the smallest point with `hash >= hash(key)`,
/// wrapping around. Lookups read an `Arc` snapshot and never block
/// membership writers.
///
/// # Example
/// ```rust
/// use granary_rt::placement::HashRing;
/// use granary_rt::util::SiloId;
///
/// let ring = HashRing::new(100);
/// ring.add_node(SiloId::new("s1"));
/// ring.add_node(SiloId::new("s2"));
///
/// let owner = ring.lookup("actor-456").unwrap();
/// assert_eq!(ring.lookup("actor-456").unwrap(), owner);
/// ```
pub struct HashRing {
    virtual_nodes: usize,
    members: Mutex<BTreeSet<SiloId>>,
    snapshot: RwLock<Arc<RingSnapshot>>,
}

impl HashRing {
    /// Create an empty ring with the given virtual points per node.
    pub fn new(virtual_nodes: usize) -> Self {
        Self {
            virtual_nodes: virtual_nodes.max(1),
            members: Mutex::new(BTreeSet::new()),
            snapshot: RwLock::new(Arc::new(RingSnapshot { points: Vec::new() })),
        }
    }

    /// Add a member. A repeat add is a no-op.
    pub fn add_node(&self, silo: SiloId) {
        let mut members = self.members.lock();
        if members.insert(silo) {
            self.rebuild(&members);
        }
    }

    /// Remove a member. Removing an absent member is a no-op.
    pub fn remove_node(&self, silo: &SiloId) {
        let mut members = self.members.lock();
        if members.remove(silo) {
            self.rebuild(&members);
        }
    }

    /// Current members, sorted.
    pub fn nodes(&self) -> Vec<SiloId> {
        self.members.lock().iter().cloned().collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether the ring has no members.
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    fn rebuild(&self, members: &BTreeSet<SiloId>) {
        let mut points = Vec::with_capacity(members.len() * self.virtual_nodes);
        for silo in members {
            for replica in 0..self.virtual_nodes {
                let point = hash_key(&format!("{}:{replica}", silo.as_str()));
                points.push((point, silo.clone()));
            }
        }
        points.sort_by(|a, b| a.0.cmp(&b.0));
        *self.snapshot.write() = Arc::new(RingSnapshot { points });
    }

    /// The owning silo for a key, if the ring has members.
    pub fn lookup(&self, key: &str) -> Option<SiloId> {
        let snapshot = Arc::clone(&self.snapshot.read());
        if snapshot.points.is_empty() {
            return None;
        }
        let hash = hash_key(key);
        let index = snapshot
            .points
            .partition_point(|(point, _)| *point < hash);
        let index = if index == snapshot.points.len() { 0 } else { index };
        Some(snapshot.points[index].1.clone())
    }

    /// Distinct silos in clockwise order starting at the key's owner.
    ///
    /// Used by placement to walk past owners that are not candidates.
    pub fn walk(&self, key: &str) -> Vec<SiloId> {
        let snapshot = Arc::clone(&self.snapshot.read());
        if snapshot.points.is_empty() {
            return Vec::new();
        }
        let hash = hash_key(key);
        let start = snapshot
            .points
            .partition_point(|(point, _)| *point < hash);
        let total = snapshot.points.len();
        let mut seen = Vec::new();
        for offset in 0..total {
            let (_, silo) = &snapshot.points[(start + offset) % total];
            if !seen.contains(silo) {
                seen.push(silo.clone());
            }
        }
        seen
    }
}
