//! Core types used throughout antnet.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Identifier of a network endpoint (a routable destination).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Ipv4Addr);

impl NodeId {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self(addr)
    }

    pub fn addr(self) -> Ipv4Addr {
        self.0
    }

    /// Whether this endpoint is a multicast group rather than a unicast host.
    pub fn is_multicast(self) -> bool {
        self.0.is_multicast()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Ipv4Addr> for NodeId {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl From<[u8; 4]> for NodeId {
    fn from(octets: [u8; 4]) -> Self {
        Self(Ipv4Addr::from(octets))
    }
}

/// Identifier of a directly-connected neighbor (its next-hop address).
///
/// Ordering is used for deterministic tie-breaking during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NeighborId(pub Ipv4Addr);

impl NeighborId {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self(addr)
    }

    pub fn addr(self) -> Ipv4Addr {
        self.0
    }
}

impl fmt::Display for NeighborId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Ipv4Addr> for NeighborId {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl From<[u8; 4]> for NeighborId {
    fn from(octets: [u8; 4]) -> Self {
        Self(Ipv4Addr::from(octets))
    }
}

/// Index of a network interface, assigned by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterfaceId(pub u32);

impl InterfaceId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

impl From<u32> for InterfaceId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// Minimal view of a packet header: the fields the engine reads.
///
/// The host environment owns the full packet representation; the engine
/// never mutates headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketHeader {
    /// Originating endpoint.
    pub source: NodeId,
    /// Destination endpoint.
    pub destination: NodeId,
}

impl PacketHeader {
    pub fn new(source: impl Into<NodeId>, destination: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl fmt::Display for PacketHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// A neighbor considered for selection, together with the interface it is
/// reachable over. Derived on demand from interface state, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub neighbor: NeighborId,
    pub interface: InterfaceId,
}

impl Candidate {
    pub fn new(neighbor: impl Into<NeighborId>, interface: impl Into<InterfaceId>) -> Self {
        Self {
            neighbor: neighbor.into(),
            interface: interface.into(),
        }
    }
}

/// Why a selection produced no route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoRouteReason {
    /// No neighbor is reachable over any up interface.
    NoCandidates,
    /// An output-interface hint was given but that interface is down.
    InterfaceDown,
}

impl fmt::Display for NoRouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no candidate neighbors"),
            Self::InterfaceDown => write!(f, "hinted interface is down"),
        }
    }
}

/// Outcome of a next-hop selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Forward via the chosen neighbor over the given interface.
    Forward {
        neighbor: NeighborId,
        interface: InterfaceId,
    },
    /// No usable next-hop exists.
    Unreachable(NoRouteReason),
}

impl RouteDecision {
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::Forward { .. })
    }

    pub fn neighbor(&self) -> Option<NeighborId> {
        match self {
            Self::Forward { neighbor, .. } => Some(*neighbor),
            Self::Unreachable(_) => None,
        }
    }
}

/// A concrete output route handed back to the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Final destination.
    pub destination: NodeId,
    /// Next-hop gateway address.
    pub next_hop: NeighborId,
    /// Egress interface.
    pub interface: InterfaceId,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} via {} dev {}",
            self.destination, self.next_hop, self.interface
        )
    }
}
