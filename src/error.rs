//! Error types for antnet.

use std::io;

use thiserror::Error;

use crate::types::{InterfaceId, NeighborId, NodeId};

/// Result type alias for antnet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for antnet.
#[derive(Error, Debug)]
pub enum Error {
    // Routing errors
    #[error("no route to host {destination}")]
    NoRouteToHost { destination: NodeId },

    #[error("unknown interface {0}")]
    UnknownInterface(InterfaceId),

    #[error("invalid feedback for {destination} via {neighbor}: pair not in current topology")]
    InvalidFeedback {
        destination: NodeId,
        neighbor: NeighborId,
    },

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // General errors
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if the error is recoverable: the packet is undeliverable but
    /// the engine keeps running.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoRouteToHost { .. } | Error::InvalidFeedback { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_errors_are_recoverable() {
        let err = Error::NoRouteToHost {
            destination: NodeId::from([10, 0, 0, 9]),
        };
        assert!(err.is_recoverable());
        assert!(!Error::InvalidConfig("bad".into()).is_recoverable());
    }

    #[test]
    fn display_includes_destination() {
        let err = Error::NoRouteToHost {
            destination: NodeId::from([10, 0, 0, 9]),
        };
        assert_eq!(err.to_string(), "no route to host 10.0.0.9");
    }
}
