//! Pheromone table: per-(destination, neighbor) trail levels.
//!
//! Levels decay multiplicatively on every update tick and grow on positive
//! delivery feedback. All mutation happens behind a single lock so a
//! selection never observes a half-evaporated table.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::PheromoneConfig;
use crate::types::{NeighborId, NodeId};

/// Pheromone store keyed by (destination, neighbor).
#[derive(Debug)]
pub struct PheromoneStore {
    config: PheromoneConfig,
    table: RwLock<HashMap<(NodeId, NeighborId), f64>>,
}

impl PheromoneStore {
    /// Create an empty store.
    pub fn new(config: PheromoneConfig) -> Self {
        Self {
            config,
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Get configuration.
    pub fn config(&self) -> &PheromoneConfig {
        &self.config
    }

    /// Apply one round of evaporation: every level shrinks by the
    /// evaporation rate, and entries falling below the prune threshold
    /// are deleted.
    pub fn evaporate(&self) {
        let keep = 1.0 - self.config.evaporation_rate;
        let threshold = self.config.prune_threshold;

        let mut table = self.table.write();
        let before = table.len();
        for level in table.values_mut() {
            *level *= keep;
        }
        table.retain(|_, level| *level >= threshold);
        let pruned = before - table.len();

        if pruned > 0 {
            trace!(pruned, remaining = table.len(), "evaporation pruned entries");
        }
    }

    /// Strengthen the trail toward `destination` via `neighbor`, creating
    /// the entry if absent. The level is clamped to the configured maximum.
    ///
    /// Negative or non-finite deltas are programming errors upstream and
    /// are ignored with a diagnostic.
    pub fn reinforce(&self, destination: NodeId, neighbor: NeighborId, delta: f64) {
        if !delta.is_finite() || delta < 0.0 {
            debug!(%destination, %neighbor, delta, "ignoring invalid reinforcement delta");
            return;
        }

        let mut table = self.table.write();
        let level = table.entry((destination, neighbor)).or_insert(0.0);
        *level = (*level + delta).min(self.config.max_level);
        trace!(%destination, %neighbor, level = *level, "reinforced");
    }

    /// Weaken the trail toward `destination` via `neighbor`, clamped at 0.
    /// Absent entries stay absent.
    pub fn penalize(&self, destination: NodeId, neighbor: NeighborId, delta: f64) {
        if !delta.is_finite() || delta < 0.0 {
            debug!(%destination, %neighbor, delta, "ignoring invalid penalty delta");
            return;
        }

        let mut table = self.table.write();
        if let Some(level) = table.get_mut(&(destination, neighbor)) {
            *level = (*level - delta).max(0.0);
            trace!(%destination, %neighbor, level = *level, "penalized");
        }
    }

    /// Current level for the pair; 0 for absent entries.
    pub fn level_of(&self, destination: NodeId, neighbor: NeighborId) -> f64 {
        self.table
            .read()
            .get(&(destination, neighbor))
            .copied()
            .unwrap_or(0.0)
    }

    /// Neighbors holding a nonzero entry for `destination`, in ascending
    /// neighbor order.
    pub fn neighbors_for(&self, destination: NodeId) -> Vec<NeighborId> {
        let table = self.table.read();
        let mut neighbors: Vec<_> = table
            .iter()
            .filter(|((dest, _), level)| *dest == destination && **level > 0.0)
            .map(|((_, neighbor), _)| *neighbor)
            .collect();
        neighbors.sort_unstable();
        neighbors
    }

    /// Drop every entry routed via `neighbor` (interface-down cascade).
    ///
    /// Returns the destinations left with no remaining entries at all,
    /// so the caller can surface newly-unreachable destinations.
    pub fn purge_neighbor(&self, neighbor: NeighborId) -> Vec<NodeId> {
        let mut table = self.table.write();

        let affected: Vec<NodeId> = table
            .keys()
            .filter(|(_, n)| *n == neighbor)
            .map(|(dest, _)| *dest)
            .collect();

        table.retain(|(_, n), _| *n != neighbor);

        let mut orphaned: Vec<NodeId> = affected
            .into_iter()
            .filter(|dest| !table.keys().any(|(d, _)| d == dest))
            .collect();
        orphaned.sort_unstable();
        orphaned.dedup();

        if !orphaned.is_empty() {
            debug!(%neighbor, orphaned = orphaned.len(), "purge left destinations without trails");
        }
        orphaned
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}
