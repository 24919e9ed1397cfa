//! Error types for the simulation harness.

use canopy_topology::TopologyError;
use canopy_wire::{TransportError, WireError};
use thiserror::Error;

/// Simulation harness errors.
#[derive(Error, Debug)]
pub enum SimError {
    /// Topology construction or routing failure.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Wire codec failure.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Delivery to a simulated group failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
