//! Topology inspection commands.

use anyhow::{Context, Result};
use canopy_topology::{Topology, from_file};
use canopy_types::GroupId;

pub fn check(path: &str) -> Result<()> {
    let topology = load(path)?;

    println!(
        "topology ok: {} groups, root {}, depth {}",
        topology.len(),
        topology.root(),
        topology.depth()
    );
    for group in topology.groups() {
        let children = topology.children_of(group)?;
        let list = children
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {group} -> [{list}]");
    }

    Ok(())
}

pub fn route(path: &str, from: u64, to: u64) -> Result<()> {
    let topology = load(path)?;

    let hops = topology
        .find_path(GroupId::new(from), GroupId::new(to))
        .with_context(|| format!("no relay path from group {from} to group {to}"))?;
    let rendered = hops
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");
    println!("{rendered}");

    Ok(())
}

pub fn lca(path: &str, targets: &[u64]) -> Result<()> {
    let topology = load(path)?;

    let targets: Vec<GroupId> = targets.iter().copied().map(GroupId::new).collect();
    let entry = topology
        .lowest_common_ancestor(&targets)
        .context("no entry group covers every target")?;
    println!("{entry}");

    Ok(())
}

fn load(path: &str) -> Result<Topology> {
    from_file(path).with_context(|| format!("failed to load topology from {path}"))
}
