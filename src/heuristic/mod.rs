//! Instantaneous link-desirability estimation.
//!
//! Scores are derived from observed link cost (delay, loss, queue
//! occupancy as the host chooses to express it) and recomputed wholesale
//! each tick: two identical metric snapshots always yield identical
//! scores.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use crate::config::HeuristicConfig;
use crate::types::{InterfaceId, NeighborId};

/// Boundary to the host's neighbor and link-quality knowledge.
///
/// The estimator never touches physical link state directly; everything
/// it knows about the network arrives through this trait.
pub trait LinkMetrics: Send + Sync {
    /// Neighbors currently reachable over the given interface.
    fn current_neighbors(&self, interface: InterfaceId) -> Vec<NeighborId>;

    /// Cost of the link to a neighbor (lower is better, e.g. smoothed
    /// delay in seconds). Non-finite or negative costs mark the link as
    /// unusable.
    fn cost_to(&self, neighbor: NeighborId) -> f64;
}

/// Per-neighbor heuristic score table.
#[derive(Debug)]
pub struct HeuristicEstimator {
    config: HeuristicConfig,
    table: RwLock<HashMap<NeighborId, f64>>,
}

impl HeuristicEstimator {
    /// Create an empty estimator.
    pub fn new(config: HeuristicConfig) -> Self {
        Self {
            config,
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the table with fresh scores for exactly the given
    /// candidates: `score = 1 / (cost + epsilon)`.
    ///
    /// The swap is atomic with respect to readers, so no partial
    /// staleness across neighbors is ever observable.
    pub fn recompute(&self, candidates: &[NeighborId], metrics: &dyn LinkMetrics) {
        let fresh: HashMap<NeighborId, f64> = candidates
            .iter()
            .map(|&neighbor| (neighbor, self.score_from_cost(metrics.cost_to(neighbor))))
            .collect();

        trace!(neighbors = fresh.len(), "heuristic table recomputed");
        *self.table.write() = fresh;
    }

    fn score_from_cost(&self, cost: f64) -> f64 {
        if cost.is_finite() && cost >= 0.0 {
            1.0 / (cost + self.config.cost_epsilon)
        } else {
            0.0
        }
    }

    /// Current score for a neighbor; 0 for unknown neighbors.
    pub fn score_of(&self, neighbor: NeighborId) -> f64 {
        self.table.read().get(&neighbor).copied().unwrap_or(0.0)
    }

    /// Remove a neighbor immediately (interface-down notification),
    /// rather than waiting for the next tick.
    pub fn drop_neighbor(&self, neighbor: NeighborId) {
        self.table.write().remove(&neighbor);
    }

    /// Number of scored neighbors.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Whether no neighbor is scored.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}
