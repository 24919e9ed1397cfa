//! Group configuration scaffolding.

use anyhow::{Context, Result};
use canopy_cluster::scaffold_groups;
use canopy_topology::from_file;

pub fn init(topology_path: &str, home: &str, base_port: u16) -> Result<()> {
    let topology = from_file(topology_path)
        .with_context(|| format!("failed to load topology from {topology_path}"))?;

    let dirs = scaffold_groups(home, &topology, base_port)
        .context("failed to write group configurations")?;

    for group in topology.groups() {
        println!("wrote {}", dirs.config_path(group).display());
    }
    println!(
        "{} groups configured under {}",
        topology.len(),
        dirs.home().display()
    );

    Ok(())
}
