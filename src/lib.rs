//! # Antnet
//!
//! Ant-colony-optimization route selection for multi-hop networks.
//!
//! Antnet keeps a per-(destination, neighbor) pheromone table and a
//! per-neighbor heuristic table, periodically evaporates and recomputes
//! them, and combines both into a probabilistic next-hop choice for each
//! packet. Delivery outcomes flow back into the pheromone table, so good
//! paths accumulate trail and bad ones fade out.
//!
//! ## Architecture
//!
//! ┌───────────────────────────────────────────────────────────┐
//! │                     Host IP layer                         │
//! ├───────────────────────────────────────────────────────────┤
//! │  RoutingProtocol boundary (AcoRouter)                     │
//! │   resolve_output / handle_input / interface lifecycle     │
//! ├──────────────┬──────────────────┬─────────────────────────┤
//! │ RouteSelector│  PheromoneStore  │  HeuristicEstimator     │
//! ├──────────────┴──────────────────┴─────────────────────────┤
//! │  UpdateLoop  ←  TickScheduler (host scheduling capability)│
//! └───────────────────────────────────────────────────────────┘
//!
//! The engine owns no timers, sockets, or interface enumeration: the
//! host supplies a fire-once scheduling capability and a neighbor/link
//! metric capability, and consumes routes through the
//! [`RoutingProtocol`] trait.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow stylistic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]      // Many functions can't be const due to trait bounds
#![allow(clippy::doc_markdown)]              // ASCII diagrams in docs
#![allow(clippy::cast_precision_loss)]       // Acceptable for probability math
#![allow(clippy::suboptimal_flops)]          // Clarity over micro-optimization
#![allow(clippy::float_cmp)]                 // Exact values are intentional in tests
#![allow(clippy::len_without_is_empty)]      // Tables expose both
#![allow(clippy::option_if_let_else)]        // More readable in context
#![allow(clippy::use_self)]                  // Explicit type names in matches
#![allow(clippy::significant_drop_tightening)] // Lock scopes are intentional

pub mod config;
pub mod engine;
pub mod error;
pub mod heuristic;
pub mod pheromone;
pub mod router;
pub mod selector;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use router::{AcoRouter, InputCallbacks, RoutingProtocol};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default interval between update ticks.
pub const DEFAULT_UPDATE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EngineConfig, SelectionMode, SelectorConfig};
    pub use crate::engine::{TickScheduler, TokioScheduler, UpdateLoop};
    pub use crate::error::{Error, Result};
    pub use crate::heuristic::{HeuristicEstimator, LinkMetrics};
    pub use crate::pheromone::PheromoneStore;
    pub use crate::router::{AcoRouter, InputCallbacks, RoutingProtocol};
    pub use crate::selector::RouteSelector;
    pub use crate::types::*;
}
