//! Next-hop selection combining pheromone and heuristic scores.
//!
//! Each candidate neighbor gets weight `tau^alpha * eta^beta`. Stochastic
//! mode samples the normalized weight distribution; deterministic mode
//! takes the arg-max with ties broken by lowest neighbor id. When every
//! weight is zero the selector falls back to uniform exploration so
//! forwarding makes progress before the tables have learned anything.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::{SelectionMode, SelectorConfig};
use crate::heuristic::HeuristicEstimator;
use crate::pheromone::PheromoneStore;
use crate::types::{Candidate, NoRouteReason, NodeId, RouteDecision};

/// Probabilistic next-hop selector.
pub struct RouteSelector {
    config: SelectorConfig,
    rng: Mutex<StdRng>,
}

impl RouteSelector {
    /// Create a selector. A configured seed makes stochastic selection
    /// reproducible; otherwise the RNG is seeded from the OS.
    pub fn new(config: SelectorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Get configuration.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Pick a next-hop for `destination` among `candidates`.
    pub fn select(
        &self,
        destination: NodeId,
        candidates: &[Candidate],
        pheromone: &PheromoneStore,
        heuristic: &HeuristicEstimator,
    ) -> RouteDecision {
        if candidates.is_empty() {
            return RouteDecision::Unreachable(NoRouteReason::NoCandidates);
        }

        let weights = self.weights(destination, candidates, pheromone, heuristic);
        let total: f64 = weights.iter().sum();

        let index = if total <= 0.0 {
            // Pure exploration: nothing learned yet.
            let index = self.rng.lock().gen_range(0..candidates.len());
            trace!(%destination, "all weights zero, exploring uniformly");
            index
        } else {
            match self.config.mode {
                SelectionMode::Deterministic => Self::argmax(candidates, &weights),
                SelectionMode::Stochastic => self.sample(&weights, total),
            }
        };

        let chosen = candidates[index];
        trace!(%destination, neighbor = %chosen.neighbor, "next-hop selected");
        RouteDecision::Forward {
            neighbor: chosen.neighbor,
            interface: chosen.interface,
        }
    }

    /// Normalized selection probabilities for the candidate set. Falls
    /// back to the uniform distribution when every weight is zero,
    /// mirroring `select`.
    pub fn probabilities(
        &self,
        destination: NodeId,
        candidates: &[Candidate],
        pheromone: &PheromoneStore,
        heuristic: &HeuristicEstimator,
    ) -> Vec<(Candidate, f64)> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let weights = self.weights(destination, candidates, pheromone, heuristic);
        let total: f64 = weights.iter().sum();

        if total <= 0.0 {
            let uniform = 1.0 / candidates.len() as f64;
            return candidates.iter().map(|&c| (c, uniform)).collect();
        }

        candidates
            .iter()
            .zip(&weights)
            .map(|(&c, &w)| (c, w / total))
            .collect()
    }

    fn weights(
        &self,
        destination: NodeId,
        candidates: &[Candidate],
        pheromone: &PheromoneStore,
        heuristic: &HeuristicEstimator,
    ) -> Vec<f64> {
        candidates
            .iter()
            .map(|c| {
                let tau = pheromone.level_of(destination, c.neighbor);
                let eta = heuristic.score_of(c.neighbor);
                // An absent component contributes a neutral factor so the
                // other can dominate; a candidate with neither is
                // weightless and left to the exploration fallback.
                if tau <= 0.0 && eta <= 0.0 {
                    return 0.0;
                }
                let tau_factor = if tau > 0.0 { tau.powf(self.config.alpha) } else { 1.0 };
                let eta_factor = if eta > 0.0 { eta.powf(self.config.beta) } else { 1.0 };
                let weight = tau_factor * eta_factor;
                // Inputs are invariant-guaranteed non-negative; a NaN here
                // is clamped rather than propagated.
                if weight.is_finite() && weight > 0.0 {
                    weight
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn argmax(candidates: &[Candidate], weights: &[f64]) -> usize {
        let mut best = 0;
        for i in 1..candidates.len() {
            let wins = weights[i] > weights[best]
                || (weights[i] == weights[best]
                    && candidates[i].neighbor < candidates[best].neighbor);
            if wins {
                best = i;
            }
        }
        best
    }

    fn sample(&self, weights: &[f64], total: f64) -> usize {
        let mut remaining = self.rng.lock().gen::<f64>() * total;
        for (i, w) in weights.iter().enumerate() {
            if remaining < *w {
                return i;
            }
            remaining -= w;
        }
        // Floating-point underrun on the last bucket.
        weights.len() - 1
    }
}

// RNG state is not useful in debug output.
#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for RouteSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSelector")
            .field("mode", &self.config.mode)
            .finish()
    }
}
