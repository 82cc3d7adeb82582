// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use dashmap::DashMap;

// Layer 3: Internal module imports
// (none)

/// Counters for one directed communication edge.
#[derive(Debug, Clone)]
pub struct EdgeMetrics {
    pub message_count: u64,
    pub total_bytes: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A directed edge with its metrics.
#[derive(Debug, Clone)]
pub struct CommunicationEdge {
    pub from: String,
    pub to: String,
    pub metrics: EdgeMetrics,
}

/// Snapshot of the communication graph inside one time window.
#[derive(Debug, Clone, Default)]
pub struct CommunicationGraph {
    edges: Vec<CommunicationEdge>,
}

impl CommunicationGraph {
    /// The edges, unordered.
    pub fn edges(&self) -> &[CommunicationEdge] {
        &self.edges
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether any edge touches the actor, in either direction.
    pub fn has_edges_for(&self, actor_id: &str) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.from == actor_id || edge.to == actor_id)
    }
}

fn window_to_chrono(window: Duration) -> chrono::Duration {
    chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX)
}

/// Tracks pairwise communication between actors over time.
///
/// Feeds locality-aware placement: hot pairs are the most-communicating
/// directed edges; stale edges age out via [`clear_old_data`].
///
/// [`clear_old_data`]: LocalityAnalyzer::clear_old_data
pub struct LocalityAnalyzer {
    edges: DashMap<(String, String), EdgeMetrics>,
}

impl LocalityAnalyzer {
    /// Create an analyzer with no recorded edges.
    pub fn new() -> Self {
        Self {
            edges: DashMap::new(),
        }
    }

    /// Count one message of `bytes` bytes on the `(from, to)` edge.
    pub fn record_interaction(&self, from: &str, to: &str, bytes: u64) {
        let now = Utc::now();
        let mut entry = self
            .edges
            .entry((from.to_owned(), to.to_owned()))
            .or_insert_with(|| EdgeMetrics {
                message_count: 0,
                total_bytes: 0,
                first_seen: now,
                last_seen: now,
            });
        entry.message_count += 1;
        entry.total_bytes += bytes;
        entry.last_seen = now;
    }

    /// The graph restricted to edges whose `last_seen` lies within
    /// `window` of now.
    pub fn graph(&self, window: Duration) -> CommunicationGraph {
        let cutoff = Utc::now() - window_to_chrono(window);
        let edges = self
            .edges
            .iter()
            .filter(|entry| entry.value().last_seen >= cutoff)
            .map(|entry| CommunicationEdge {
                from: entry.key().0.clone(),
                to: entry.key().1.clone(),
                metrics: entry.value().clone(),
            })
            .collect();
        CommunicationGraph { edges }
    }

    /// The `top` edges by message count, descending.
    pub fn hot_pairs(&self, top: usize) -> Vec<CommunicationEdge> {
        let mut edges: Vec<CommunicationEdge> = self
            .edges
            .iter()
            .map(|entry| CommunicationEdge {
                from: entry.key().0.clone(),
                to: entry.key().1.clone(),
                metrics: entry.value().clone(),
            })
            .collect();
        edges.sort_by(|a, b| b.metrics.message_count.cmp(&a.metrics.message_count));
        edges.truncate(top);
        edges
    }

    /// The actor's communication neighborhood: peers on edges touching it
    /// in either direction, weighted by message count, descending,
    /// truncated to `top`.
    pub fn neighbors(&self, actor_id: &str, top: usize) -> Vec<(String, u64)> {
        let mut peers: Vec<(String, u64)> = self
            .edges
            .iter()
            .filter_map(|entry| {
                let (from, to) = entry.key();
                let weight = entry.value().message_count;
                if from == actor_id {
                    Some((to.clone(), weight))
                } else if to == actor_id {
                    Some((from.clone(), weight))
                } else {
                    None
                }
            })
            .collect();
        peers.sort_by(|a, b| b.1.cmp(&a.1));
        peers.truncate(top);
        peers
    }

    /// Drop edges whose `last_seen` is older than `max_age`. A zero
    /// `max_age` clears every edge.
    pub fn clear_old_data(&self, max_age: Duration) {
        if max_age.is_zero() {
            self.edges.clear();
            return;
        }
        let cutoff = Utc::now() - window_to_chrono(max_age);
        self.edges.retain(|_, metrics| metrics.last_seen >= cutoff);
    }

    /// Number of tracked edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl Default for LocalityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
