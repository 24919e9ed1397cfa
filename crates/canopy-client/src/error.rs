//! Error types for the client library.

use canopy_topology::TopologyError;
use canopy_wire::{TransportError, WireError};
use thiserror::Error;

/// Client-side errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Entry-group selection failed.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Request or reply codec failure.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The ordered round-trip to the entry group failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Stats file IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
