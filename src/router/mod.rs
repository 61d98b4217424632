//! Routing-protocol adapter: the boundary between the host IP layer and
//! the pheromone/heuristic engine.
//!
//! `AcoRouter` owns the tables, derives candidate sets from interface
//! state, answers output-route and input-route queries, and feeds
//! delivery outcomes back into the pheromone table.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::{TickScheduler, UpdateLoop};
use crate::error::{Error, Result};
use crate::heuristic::{HeuristicEstimator, LinkMetrics};
use crate::pheromone::PheromoneStore;
use crate::selector::RouteSelector;
use crate::types::{
    Candidate, InterfaceId, NeighborId, NoRouteReason, NodeId, PacketHeader, Route,
    RouteDecision,
};

/// Outcome callbacks for input-route handling, in the conventional
/// IP-routing-protocol shape.
pub trait InputCallbacks {
    /// Forward the packet along the resolved route.
    fn forward(&mut self, route: &Route, header: &PacketHeader);

    /// Forward a multicast packet.
    fn multicast_forward(&mut self, header: &PacketHeader, incoming: InterfaceId);

    /// Deliver the packet to the local stack.
    fn local_deliver(&mut self, header: &PacketHeader, incoming: InterfaceId);

    /// Drop the packet; `error` says why.
    fn drop_packet(&mut self, header: &PacketHeader, error: &Error);
}

/// The routing-protocol contract exposed to the host environment.
pub trait RoutingProtocol: Send + Sync {
    /// Resolve an output route for a locally-originated packet.
    fn resolve_output(
        &self,
        header: &PacketHeader,
        oif_hint: Option<InterfaceId>,
    ) -> Result<Route>;

    /// Handle a packet arriving on `incoming`. Returns whether the
    /// packet was handled (delivered or forwarded); `false` declines it
    /// up the stack.
    fn handle_input(
        &self,
        header: &PacketHeader,
        incoming: InterfaceId,
        callbacks: &mut dyn InputCallbacks,
    ) -> bool;

    /// An interface came up.
    fn notify_interface_up(&self, interface: InterfaceId);

    /// An interface went down.
    fn notify_interface_down(&self, interface: InterfaceId) -> Result<()>;

    /// An address was configured on an interface.
    fn notify_add_address(&self, interface: InterfaceId, address: NodeId) -> Result<()>;

    /// An address was removed from an interface.
    fn notify_remove_address(&self, interface: InterfaceId, address: NodeId) -> Result<()>;
}

/// Per-interface state tracked by the router.
#[derive(Debug, Default)]
struct InterfaceState {
    up: bool,
    addresses: HashSet<NodeId>,
}

/// ACO-based routing adapter.
pub struct AcoRouter {
    config: EngineConfig,
    pheromone: Arc<PheromoneStore>,
    heuristic: Arc<HeuristicEstimator>,
    selector: RouteSelector,
    /// Neighbor/link-metric capability, bound once at construction.
    metrics: Arc<dyn LinkMetrics>,
    interfaces: DashMap<InterfaceId, InterfaceState>,
    update_loop: Arc<UpdateLoop>,
}

impl AcoRouter {
    /// Create a router and arm its periodic update loop.
    pub fn new(
        config: EngineConfig,
        metrics: Arc<dyn LinkMetrics>,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let router = Arc::new(Self {
            pheromone: Arc::new(PheromoneStore::new(config.pheromone.clone())),
            heuristic: Arc::new(HeuristicEstimator::new(config.heuristic.clone())),
            selector: RouteSelector::new(config.selector.clone()),
            metrics,
            interfaces: DashMap::new(),
            update_loop: UpdateLoop::new(config.update.interval, scheduler),
            config,
        });

        // The loop must not keep the router alive; a dangling upgrade
        // simply means the router is gone and the tick is a no-op.
        let weak = Arc::downgrade(&router);
        router.update_loop.start(Arc::new(move || {
            if let Some(router) = weak.upgrade() {
                router.periodic_update();
            }
        }));

        info!(interval = ?router.config.update.interval, "ACO router started");
        Ok(router)
    }

    /// Get configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pheromone table handle (read access for diagnostics and tests).
    pub fn pheromone(&self) -> &PheromoneStore {
        &self.pheromone
    }

    /// Heuristic table handle.
    pub fn heuristic(&self) -> &HeuristicEstimator {
        &self.heuristic
    }

    /// Selector handle.
    pub fn selector(&self) -> &RouteSelector {
        &self.selector
    }

    /// One evaporation + heuristic recomputation pass. Driven by the
    /// update loop; public so hosts without a scheduler can drive the
    /// engine manually.
    pub fn periodic_update(&self) {
        self.pheromone.evaporate();

        let candidates = self.candidates(None);
        let neighbors: Vec<NeighborId> = candidates.iter().map(|c| c.neighbor).collect();
        self.heuristic.recompute(&neighbors, self.metrics.as_ref());
    }

    /// Stop the periodic update loop. Also runs on drop.
    pub fn shutdown(&self) {
        self.update_loop.shutdown();
    }

    /// Current candidate set: neighbors reachable over up interfaces,
    /// optionally restricted to a hinted egress interface. One entry per
    /// neighbor; the first up interface reaching it wins.
    fn candidates(&self, oif_hint: Option<InterfaceId>) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = Vec::new();
        let mut seen: HashSet<NeighborId> = HashSet::new();

        let mut interfaces: Vec<InterfaceId> = self
            .interfaces
            .iter()
            .filter(|entry| entry.value().up)
            .map(|entry| *entry.key())
            .collect();
        interfaces.sort_unstable();

        for interface in interfaces {
            if let Some(hint) = oif_hint {
                if hint != interface {
                    continue;
                }
            }
            for neighbor in self.metrics.current_neighbors(interface) {
                if seen.insert(neighbor) {
                    out.push(Candidate {
                        neighbor,
                        interface,
                    });
                }
            }
        }
        out
    }

    fn is_local(&self, address: NodeId) -> bool {
        self.interfaces
            .iter()
            .any(|entry| entry.value().addresses.contains(&address))
    }

    fn is_known_neighbor(&self, neighbor: NeighborId) -> bool {
        self.candidates(None).iter().any(|c| c.neighbor == neighbor)
    }

    /// Positive feedback: a packet toward `destination` sent via
    /// `neighbor` was confirmed delivered after `observed_delay`. The
    /// reinforcement is inversely proportional to the delay.
    pub fn on_delivery_confirmed(
        &self,
        destination: NodeId,
        neighbor: NeighborId,
        observed_delay: Duration,
    ) -> Result<()> {
        if !self.is_known_neighbor(neighbor) {
            warn!(%destination, %neighbor, "delivery feedback for unknown neighbor, ignoring");
            return Err(Error::InvalidFeedback {
                destination,
                neighbor,
            });
        }

        let delta = self.config.pheromone.reward_scale
            / (observed_delay.as_secs_f64() + self.config.heuristic.cost_epsilon);
        self.pheromone.reinforce(destination, neighbor, delta);
        Ok(())
    }

    /// Negative feedback: forwarding toward `destination` via `neighbor`
    /// failed at the link layer.
    pub fn on_forward_failure(&self, destination: NodeId, neighbor: NeighborId) -> Result<()> {
        if !self.is_known_neighbor(neighbor) {
            warn!(%destination, %neighbor, "failure feedback for unknown neighbor, ignoring");
            return Err(Error::InvalidFeedback {
                destination,
                neighbor,
            });
        }

        self.pheromone
            .penalize(destination, neighbor, self.config.pheromone.failure_penalty);
        Ok(())
    }

    /// Selection outcome for a destination, without fabricating a route.
    /// A hinted interface that is administratively down short-circuits to
    /// `Unreachable(InterfaceDown)` before the selector is consulted.
    pub fn select_route(
        &self,
        destination: NodeId,
        oif_hint: Option<InterfaceId>,
    ) -> RouteDecision {
        if let Some(hint) = oif_hint {
            let down = self
                .interfaces
                .get(&hint)
                .is_some_and(|state| !state.up);
            if down {
                debug!(%destination, interface = %hint, "hinted egress interface is down");
                return RouteDecision::Unreachable(NoRouteReason::InterfaceDown);
            }
        }

        let candidates = self.candidates(oif_hint);
        self.selector
            .select(destination, &candidates, &self.pheromone, &self.heuristic)
    }
}

impl RoutingProtocol for AcoRouter {
    fn resolve_output(
        &self,
        header: &PacketHeader,
        oif_hint: Option<InterfaceId>,
    ) -> Result<Route> {
        let destination = header.destination;

        match self.select_route(destination, oif_hint) {
            RouteDecision::Forward {
                neighbor,
                interface,
            } => Ok(Route {
                destination,
                next_hop: neighbor,
                interface,
            }),
            RouteDecision::Unreachable(reason) => {
                debug!(%destination, %reason, "output resolution failed");
                Err(Error::NoRouteToHost { destination })
            }
        }
    }

    fn handle_input(
        &self,
        header: &PacketHeader,
        incoming: InterfaceId,
        callbacks: &mut dyn InputCallbacks,
    ) -> bool {
        let destination = header.destination;

        if self.is_local(destination) {
            callbacks.local_deliver(header, incoming);
            return true;
        }

        if destination.is_multicast() {
            callbacks.multicast_forward(header, incoming);
            return true;
        }

        match self.resolve_output(header, None) {
            Ok(route) => {
                callbacks.forward(&route, header);
                true
            }
            Err(error) => {
                debug!(%header, %error, "declining to route");
                callbacks.drop_packet(header, &error);
                false
            }
        }
    }

    fn notify_interface_up(&self, interface: InterfaceId) {
        let mut state = self.interfaces.entry(interface).or_default();
        state.up = true;
        debug!(%interface, "interface up");
    }

    fn notify_interface_down(&self, interface: InterfaceId) -> Result<()> {
        {
            let mut state = self
                .interfaces
                .get_mut(&interface)
                .ok_or(Error::UnknownInterface(interface))?;
            state.up = false;
        }

        // Neighbors that were reachable only via this interface lose
        // their table entries immediately.
        let still_reachable: HashSet<NeighborId> = self
            .candidates(None)
            .into_iter()
            .map(|c| c.neighbor)
            .collect();

        for neighbor in self.metrics.current_neighbors(interface) {
            if still_reachable.contains(&neighbor) {
                continue;
            }
            self.heuristic.drop_neighbor(neighbor);
            for destination in self.pheromone.purge_neighbor(neighbor) {
                warn!(%destination, %neighbor, %interface, "destination lost its only trail");
            }
        }

        debug!(%interface, "interface down");
        Ok(())
    }

    fn notify_add_address(&self, interface: InterfaceId, address: NodeId) -> Result<()> {
        let mut state = self
            .interfaces
            .get_mut(&interface)
            .ok_or(Error::UnknownInterface(interface))?;
        state.addresses.insert(address);
        debug!(%interface, %address, "address added");
        Ok(())
    }

    fn notify_remove_address(&self, interface: InterfaceId, address: NodeId) -> Result<()> {
        let mut state = self
            .interfaces
            .get_mut(&interface)
            .ok_or(Error::UnknownInterface(interface))?;
        state.addresses.remove(&address);
        debug!(%interface, %address, "address removed");
        Ok(())
    }
}

impl Drop for AcoRouter {
    fn drop(&mut self) {
        self.update_loop.shutdown();
    }
}

// Table contents are not useful in debug output.
#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for AcoRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcoRouter")
            .field("interfaces", &self.interfaces.len())
            .field("pheromone_entries", &self.pheromone.len())
            .finish()
    }
}
