//! Placement: mapping a logical actor identity to a silo.
//!
//! Policies share one contract: given an ordered candidate list they
//! return a silo, and `None` exactly when the list is empty. The
//! consistent-hash ring is copy-on-write so lookups never block
//! membership changes.

pub mod directory;
pub mod locality;
pub mod policies;
pub mod ring;

pub use directory::{ActorDirectory, InMemoryDirectory};
pub use locality::{CommunicationEdge, CommunicationGraph, EdgeMetrics, LocalityAnalyzer};
pub use policies::{
    place, ConsistentHashPlacement, LocalPreferredPlacement, LocalityAwarePlacement,
    LocalityPlacementOptions, PlacementError, PlacementPolicy, RandomPlacement,
    StatelessWorkerPlacement,
};
pub use ring::{HashRing, DEFAULT_VIRTUAL_NODES};
