//! Workload driver against an in-process cluster.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use canopy_client::{MulticastClient, WorkloadConfig, run_workload, write_stats_dir};
use canopy_sim::{SimCluster, SimConfig};
use canopy_topology::from_file;
use tracing::info;

pub fn run(
    topology_path: &str,
    clients: usize,
    runtime_secs: u64,
    targets: usize,
    stats_dir: &str,
    redundancy: u32,
    threshold: u32,
) -> Result<()> {
    let topology = Arc::new(
        from_file(topology_path)
            .with_context(|| format!("failed to load topology from {topology_path}"))?,
    );
    let cluster = SimCluster::new(
        Arc::clone(&topology),
        SimConfig {
            redundancy,
            min_receive_count: threshold,
            ..SimConfig::default()
        },
    );
    let client = MulticastClient::new(topology, Arc::new(cluster.client_transport()));

    let config = WorkloadConfig {
        clients,
        runtime: Duration::from_secs(runtime_secs),
        targets_per_request: targets,
        ..WorkloadConfig::default()
    };

    info!(clients, runtime_secs, targets, "starting workload");
    let report = run_workload(&client, &config)?;

    let written = write_stats_dir(stats_dir, &report.per_client)?;

    println!("requests:   {}", report.total_requests());
    println!("throughput: {:.1} req/s", report.throughput());
    for path in written {
        println!("wrote {}", path.display());
    }

    Ok(())
}
