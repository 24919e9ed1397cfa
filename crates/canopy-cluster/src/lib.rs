//! Cluster configuration resolution for Canopy.
//!
//! Maps group identifiers to their on-disk configuration:
//! - Zero-padded `gNN` directories under a configuration home
//! - Per-group `group.toml` with replica count, fault tolerance, and
//!   replica addresses
//! - The cluster-wide topology file location
//!
//! The receive threshold every replica enforces is derived here as
//! `replica_count - fault_tolerance`.

pub mod config;
pub mod error;

pub use config::{GroupConfig, GroupDirs};
pub use error::{ClusterError, Result};

use canopy_topology::Topology;
use std::path::PathBuf;

/// Writes a default `group.toml` for every group in the topology,
/// creating the `gNN` directory skeleton under `home`. Each group's
/// replicas get consecutive local ports starting at `base_port`.
pub fn scaffold_groups(
    home: impl Into<PathBuf>,
    topology: &Topology,
    base_port: u16,
) -> Result<GroupDirs> {
    let dirs = GroupDirs::new(home);

    let mut port = base_port;
    for group in topology.groups() {
        let config = GroupConfig::scaffolded(group, port);
        config.save(&dirs)?;
        port += config.replica_count as u16;
    }

    Ok(dirs)
}
