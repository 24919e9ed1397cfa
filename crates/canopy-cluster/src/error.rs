//! Error types for cluster configuration.

use std::path::PathBuf;

use canopy_types::GroupId;
use thiserror::Error;

/// Cluster configuration errors.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No configuration exists for a group.
    #[error("group {group} not configured at {path}")]
    MissingGroup { group: GroupId, path: PathBuf },

    /// The fault tolerance leaves no usable receive threshold.
    #[error(
        "group {group} allows {fault_tolerance} faults among {replica_count} replicas; \
         the receive threshold would not be positive"
    )]
    InvalidThreshold {
        group: GroupId,
        replica_count: u32,
        fault_tolerance: u32,
    },

    /// The address list does not cover every replica.
    #[error("group {group} declares {replica_count} replicas but lists {addresses} addresses")]
    AddressMismatch {
        group: GroupId,
        replica_count: u32,
        addresses: usize,
    },

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Result type for cluster configuration operations.
pub type Result<T> = std::result::Result<T, ClusterError>;
