//! Property tests for the pheromone/heuristic engine: evaporation,
//! pruning, clamping, selection probability law, determinism, and the
//! interface-down cascade.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use antnet::config::{EngineConfig, SelectionMode};
use antnet::engine::{ScheduledTick, TickScheduler};
use antnet::heuristic::LinkMetrics;
use antnet::router::{AcoRouter, RoutingProtocol};
use antnet::types::{InterfaceId, NeighborId, NodeId, PacketHeader};
use antnet::Error;

/// Route test log output through the subscriber so RUST_LOG works.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scheduler whose ticks only fire when the test says so.
#[derive(Default)]
struct ManualScheduler {
    #[allow(clippy::type_complexity)]
    queue: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl ManualScheduler {
    fn fire_next(&self) -> bool {
        let callback = {
            let mut queue = self.queue.lock();
            if queue.is_empty() {
                return false;
            }
            queue.remove(0)
        };
        callback();
        true
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule_after(
        &self,
        _delay: Duration,
        callback: Box<dyn FnOnce() + Send>,
    ) -> ScheduledTick {
        self.queue.lock().push(callback);
        ScheduledTick::new(|| {})
    }
}

/// In-memory topology implementing the neighbor/link-metric capability.
#[derive(Default)]
struct Topology {
    links: Mutex<HashMap<InterfaceId, Vec<(NeighborId, f64)>>>,
}

impl Topology {
    fn add_link(&self, interface: impl Into<InterfaceId>, neighbor: NeighborId, cost: f64) {
        self.links
            .lock()
            .entry(interface.into())
            .or_default()
            .push((neighbor, cost));
    }
}

impl LinkMetrics for Topology {
    fn current_neighbors(&self, interface: InterfaceId) -> Vec<NeighborId> {
        self.links
            .lock()
            .get(&interface)
            .map(|links| links.iter().map(|(n, _)| *n).collect())
            .unwrap_or_default()
    }

    fn cost_to(&self, neighbor: NeighborId) -> f64 {
        self.links
            .lock()
            .values()
            .flatten()
            .find(|(n, _)| *n == neighbor)
            .map_or(f64::INFINITY, |(_, cost)| *cost)
    }
}

fn dest(last: u8) -> NodeId {
    NodeId::from([10, 2, 0, last])
}

fn hop(last: u8) -> NeighborId {
    NeighborId::from([10, 1, 1, last])
}

fn router_with(
    topology: Arc<Topology>,
    config: EngineConfig,
) -> (Arc<AcoRouter>, Arc<ManualScheduler>) {
    init_tracing();
    let scheduler = Arc::new(ManualScheduler::default());
    let router = AcoRouter::new(config, topology, scheduler.clone()).unwrap();
    (router, scheduler)
}

#[test]
fn evaporation_scenario_literal_values() {
    // rho = 0.1, l_max = 10 (the defaults).
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 0.05);
    let (router, _scheduler) = router_with(topology, EngineConfig::default());
    router.notify_interface_up(InterfaceId::new(1));

    router.pheromone().reinforce(dest(1), hop(1), 5.0);
    router.periodic_update();
    assert!((router.pheromone().level_of(dest(1), hop(1)) - 4.5).abs() < 1e-12);

    router.periodic_update();
    router.periodic_update();
    assert!((router.pheromone().level_of(dest(1), hop(1)) - 3.645).abs() < 1e-12);
}

#[test]
fn unreinforced_levels_decay_monotonically_to_prune() {
    let topology = Arc::new(Topology::default());
    let (router, _scheduler) = router_with(topology, EngineConfig::default());

    router.pheromone().reinforce(dest(1), hop(1), 1.0);
    let mut previous = router.pheromone().level_of(dest(1), hop(1));

    for _ in 0..256 {
        router.periodic_update();
        let level = router.pheromone().level_of(dest(1), hop(1));
        assert!(level <= previous);
        previous = level;
    }

    // 0.9^k falls below the prune threshold well before 256 ticks.
    assert_eq!(router.pheromone().level_of(dest(1), hop(1)), 0.0);
    assert!(router.pheromone().neighbors_for(dest(1)).is_empty());
}

#[test]
fn reinforcement_never_exceeds_max_level() {
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 0.001);
    let (router, _scheduler) = router_with(topology, EngineConfig::default());
    router.notify_interface_up(InterfaceId::new(1));

    for _ in 0..50 {
        router
            .on_delivery_confirmed(dest(1), hop(1), Duration::from_micros(1))
            .unwrap();
    }
    assert!(router.pheromone().level_of(dest(1), hop(1)) <= 10.0);
}

#[test]
fn stochastic_probabilities_sum_to_one() {
    let mut config = EngineConfig::default();
    config.selector.seed = Some(1);
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 0.010);
    topology.add_link(1u32, hop(2), 0.050);
    topology.add_link(1u32, hop(3), 0.200);
    let (router, _scheduler) = router_with(topology, config);
    router.notify_interface_up(InterfaceId::new(1));
    router.periodic_update();
    router.pheromone().reinforce(dest(1), hop(2), 3.0);

    let candidates: Vec<_> = (1..=3)
        .map(|i| antnet::types::Candidate::new(hop(i).addr(), 1u32))
        .collect();
    let probs = router.selector().probabilities(
        dest(1),
        &candidates,
        router.pheromone(),
        router.heuristic(),
    );
    assert_eq!(probs.len(), 3);
    let total: f64 = probs.iter().map(|(_, p)| p).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(probs.iter().all(|(_, p)| *p >= 0.0));
}

#[test]
fn deterministic_mode_repeats_the_same_choice() {
    let mut config = EngineConfig::default();
    config.selector.mode = SelectionMode::Deterministic;
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 0.010);
    topology.add_link(1u32, hop(2), 0.050);
    let (router, _scheduler) = router_with(topology, config);
    router.notify_interface_up(InterfaceId::new(1));
    router.periodic_update();

    let header = PacketHeader::new([10, 0, 0, 1], dest(1).addr());
    let first = router.resolve_output(&header, None).unwrap();
    for _ in 0..16 {
        assert_eq!(router.resolve_output(&header, None).unwrap(), first);
    }
}

#[test]
fn heuristic_dominates_when_pheromone_is_silent() {
    // Heuristic scores 0.5 vs 0.2, no pheromone, alpha=1, beta=2:
    // weights 0.25 vs 0.04, deterministic mode must pick the first.
    let mut config = EngineConfig::default();
    config.selector.mode = SelectionMode::Deterministic;
    let eps = config.heuristic.cost_epsilon;
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 2.0 - eps); // score 0.5
    topology.add_link(1u32, hop(2), 5.0 - eps); // score 0.2
    let (router, _scheduler) = router_with(topology, config);
    router.notify_interface_up(InterfaceId::new(1));
    router.periodic_update();

    let header = PacketHeader::new([10, 0, 0, 1], dest(1).addr());
    let route = router.resolve_output(&header, None).unwrap();
    assert_eq!(route.next_hop, hop(1));
}

#[test]
fn empty_tables_still_forward_via_exploration() {
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 0.1);
    topology.add_link(1u32, hop(2), 0.1);
    let (router, _scheduler) = router_with(topology, EngineConfig::default());
    router.notify_interface_up(InterfaceId::new(1));
    // No periodic update: both tables are empty for this destination.

    let header = PacketHeader::new([10, 0, 0, 1], dest(9).addr());
    for _ in 0..32 {
        let route = router.resolve_output(&header, None).unwrap();
        assert!(route.next_hop == hop(1) || route.next_hop == hop(2));
    }
}

#[test]
fn no_candidates_means_no_route_to_host() {
    let topology = Arc::new(Topology::default());
    let (router, _scheduler) = router_with(topology, EngineConfig::default());

    let header = PacketHeader::new([10, 0, 0, 1], dest(1).addr());
    match router.resolve_output(&header, None) {
        Err(Error::NoRouteToHost { destination }) => assert_eq!(destination, dest(1)),
        other => panic!("expected NoRouteToHost, got {other:?}"),
    }
}

#[test]
fn interface_down_purges_exclusive_neighbors() {
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 0.1);
    topology.add_link(2u32, hop(2), 0.1);
    let (router, _scheduler) = router_with(topology, EngineConfig::default());
    router.notify_interface_up(InterfaceId::new(1));
    router.notify_interface_up(InterfaceId::new(2));
    router.periodic_update();
    router.pheromone().reinforce(dest(1), hop(1), 2.0);
    router.pheromone().reinforce(dest(1), hop(2), 2.0);

    router.notify_interface_down(InterfaceId::new(1)).unwrap();

    assert!(!router.pheromone().neighbors_for(dest(1)).contains(&hop(1)));
    assert_eq!(router.heuristic().score_of(hop(1)), 0.0);
    // The neighbor on the surviving interface is untouched.
    assert!(router.pheromone().neighbors_for(dest(1)).contains(&hop(2)));
    assert!(router.heuristic().score_of(hop(2)) > 0.0);
}

#[test]
fn shared_neighbor_survives_single_interface_loss() {
    // hop(1) reachable via both interfaces: losing one must not purge it.
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 0.1);
    topology.add_link(2u32, hop(1), 0.2);
    let (router, _scheduler) = router_with(topology, EngineConfig::default());
    router.notify_interface_up(InterfaceId::new(1));
    router.notify_interface_up(InterfaceId::new(2));
    router.periodic_update();
    router.pheromone().reinforce(dest(1), hop(1), 2.0);

    router.notify_interface_down(InterfaceId::new(1)).unwrap();

    assert!(router.pheromone().neighbors_for(dest(1)).contains(&hop(1)));
}

#[test]
fn update_loop_ticks_evaporate_and_rearm() {
    let topology = Arc::new(Topology::default());
    topology.add_link(1u32, hop(1), 0.1);
    let (router, scheduler) = router_with(topology, EngineConfig::default());
    router.notify_interface_up(InterfaceId::new(1));
    router.pheromone().reinforce(dest(1), hop(1), 5.0);

    assert!(scheduler.fire_next());
    assert!((router.pheromone().level_of(dest(1), hop(1)) - 4.5).abs() < 1e-12);
    // Heuristic recomputed from the same tick.
    assert!(router.heuristic().score_of(hop(1)) > 0.0);

    // The loop re-armed itself.
    assert!(scheduler.fire_next());
    assert!((router.pheromone().level_of(dest(1), hop(1)) - 4.05).abs() < 1e-12);
}

#[test]
fn no_tick_fires_after_shutdown() {
    let topology = Arc::new(Topology::default());
    let (router, scheduler) = router_with(topology, EngineConfig::default());
    router.pheromone().reinforce(dest(1), hop(1), 5.0);

    router.shutdown();
    while scheduler.fire_next() {}
    assert_eq!(router.pheromone().level_of(dest(1), hop(1)), 5.0);
}
